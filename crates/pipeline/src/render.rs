//! Presentation renders requested at the end of a run.

use serde::{Deserialize, Serialize};
use verdant_algorithms::imagery::RasterComposite;
use verdant_colormap::{grid_to_rgba, rgb_composite, RgbaImage};
use verdant_core::{Band, BoundingBox, Error, RenderHandle, RenderKind, RenderRequest, Result, SampleGrid};

use crate::config::RenderConfig;

/// Handles of the three renders of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSet {
    pub before_rgb: RenderHandle,
    pub after_rgb: RenderHandle,
    pub delta_ndvi: RenderHandle,
}

fn request(kind: RenderKind, geometry: BoundingBox, image: RgbaImage) -> RenderRequest {
    RenderRequest {
        kind,
        geometry,
        width: image.width(),
        height: image.height(),
        rgba: image.into_pixels(),
    }
}

/// Stretched B4/B3/B2 true colour of a composite.
pub fn true_colour_request(
    kind: RenderKind,
    composite: &RasterComposite,
    config: &RenderConfig,
) -> Result<RenderRequest> {
    let band = |b: Band| {
        composite.band(b).ok_or_else(|| Error::Other(format!(
            "composite {} has no {} band",
            composite.window,
            b.sentinel2_name()
        )))
    };
    let image = rgb_composite(band(Band::Red)?, band(Band::Green)?, band(Band::Blue)?, &config.stretch())?
        .fit_longest_side(config.longest_side);
    Ok(request(kind, composite.geometry, image))
}

/// Index difference on the red-white-green ramp.
pub fn delta_request(geometry: BoundingBox, delta: &SampleGrid, config: &RenderConfig) -> RenderRequest {
    let image = grid_to_rgba(delta, &config.delta_colormap()).fit_longest_side(config.longest_side);
    request(RenderKind::DeltaNdvi, geometry, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::{GeoTransform, Sample};

    #[test]
    fn delta_render_is_resized_to_longest_side() {
        let geometry = BoundingBox::new(0.0, 0.0, 2.0, 1.0).unwrap();
        let transform = GeoTransform::from_bounds(&geometry, 2, 4);
        let delta = SampleGrid::from_vec(
            vec![
                Sample::new(-0.5),
                Sample::new(0.0),
                Sample::new(0.5),
                Sample::NoData,
                Sample::new(-0.1),
                Sample::new(0.1),
                Sample::new(0.2),
                Sample::new(0.3),
            ],
            2,
            4,
            transform,
        )
        .unwrap();
        let config = RenderConfig {
            longest_side: 8,
            ..RenderConfig::default()
        };

        let req = delta_request(geometry, &delta, &config);
        assert_eq!(req.kind, RenderKind::DeltaNdvi);
        assert_eq!((req.width, req.height), (8, 4));
        assert_eq!(req.rgba.len(), 8 * 4 * 4);
        // Top-left is the strongest loss: opaque red.
        assert_eq!(&req.rgba[0..4], &[255, 0, 0, 255]);
    }
}
