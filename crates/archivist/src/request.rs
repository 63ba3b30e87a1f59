/// Video request construction
///
/// The occupied slots decide the request shape:
/// - both slots: interpolation between a start and an end frame
/// - primary only: animation of a start frame
/// - otherwise: synthesis from the prompt alone; a secondary anchor is
///   only read together with a primary one
use crate::anchors::{Anchors, ImageAnchor};
use crate::styles::{AspectRatio, Resolution};
use serde::Serialize;
use std::fmt;

pub const INTERPOLATION_FRAMING: &str = "Interpolate from the starting frame to the ending frame.";
pub const ANIMATION_FRAMING: &str = "Animate this starting frame.";

/// Videos requested per job
pub const OUTPUT_COUNT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestShape {
    Interpolation,
    Animation,
    SynthesisOnly,
}

impl RequestShape {
    pub fn for_anchors(anchors: &Anchors) -> Self {
        match (anchors.primary(), anchors.secondary()) {
            (Some(_), Some(_)) => Self::Interpolation,
            (Some(_), None) => Self::Animation,
            (None, _) => Self::SynthesisOnly,
        }
    }

    pub fn framing(&self) -> Option<&'static str> {
        match self {
            Self::Interpolation => Some(INTERPOLATION_FRAMING),
            Self::Animation => Some(ANIMATION_FRAMING),
            Self::SynthesisOnly => None,
        }
    }
}

impl fmt::Display for RequestShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpolation => write!(f, "interpolation"),
            Self::Animation => write!(f, "animation"),
            Self::SynthesisOnly => write!(f, "synthesis-only"),
        }
    }
}

/// One "create video job" request, independent of the wire format
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRequest {
    pub shape: RequestShape,
    pub model: String,
    pub prompt: String,
    pub start_image: Option<ImageAnchor>,
    pub end_image: Option<ImageAnchor>,
    pub output_count: u32,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
}

impl VideoRequest {
    /// Select the request shape for the supplied anchors and frame the prompt
    pub fn build(
        model: &str,
        anchors: &Anchors,
        aspect_ratio: AspectRatio,
        composed_prompt: &str,
    ) -> Self {
        let shape = RequestShape::for_anchors(anchors);
        let prompt = match shape.framing() {
            Some(framing) => format!("{} {}", framing, composed_prompt),
            None => composed_prompt.to_string(),
        };
        let (start_image, end_image) = match shape {
            RequestShape::Interpolation => {
                (anchors.primary().cloned(), anchors.secondary().cloned())
            }
            RequestShape::Animation => (anchors.primary().cloned(), None),
            RequestShape::SynthesisOnly => (None, None),
        };

        Self {
            shape,
            model: model.to_string(),
            prompt,
            start_image,
            end_image,
            output_count: OUTPUT_COUNT,
            resolution: Resolution::P720,
            aspect_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::tests::png_bytes;
    use crate::anchors::AnchorSlot;

    fn anchor() -> ImageAnchor {
        ImageAnchor::from_bytes(png_bytes()).unwrap()
    }

    #[test]
    fn test_shape_by_occupied_slots() {
        let mut anchors = Anchors::new();
        let none = VideoRequest::build("veo", &anchors, AspectRatio::Landscape, "base");
        assert_eq!(none.shape, RequestShape::SynthesisOnly);
        assert_eq!(none.prompt, "base");
        assert!(none.start_image.is_none() && none.end_image.is_none());

        anchors.set(AnchorSlot::Primary, anchor());
        let one = VideoRequest::build("veo", &anchors, AspectRatio::Landscape, "base");
        assert_eq!(one.shape, RequestShape::Animation);
        assert_eq!(one.prompt, "Animate this starting frame. base");
        assert!(one.start_image.is_some() && one.end_image.is_none());

        anchors.set(AnchorSlot::Secondary, anchor());
        let two = VideoRequest::build("veo", &anchors, AspectRatio::Portrait, "base");
        assert_eq!(two.shape, RequestShape::Interpolation);
        assert_eq!(
            two.prompt,
            "Interpolate from the starting frame to the ending frame. base"
        );
        assert!(two.start_image.is_some() && two.end_image.is_some());
        assert_eq!(two.aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn test_fixed_parameters() {
        let request = VideoRequest::build("veo", &Anchors::new(), AspectRatio::Landscape, "p");
        assert_eq!(request.output_count, 1);
        assert_eq!(request.resolution, Resolution::P720);
        assert_eq!(request.model, "veo");
    }

    #[test]
    fn test_lone_secondary_is_ignored() {
        let mut anchors = Anchors::new();
        anchors.set(AnchorSlot::Secondary, anchor());
        let request = VideoRequest::build("veo", &anchors, AspectRatio::Landscape, "p");
        assert_eq!(request.shape, RequestShape::SynthesisOnly);
        assert_eq!(request.prompt, "p");
        assert!(request.start_image.is_none() && request.end_image.is_none());
    }
}
