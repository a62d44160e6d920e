//! Material classification by color signature.

mod classifier;
mod palette;

pub use classifier::{
    decide, Classification, ClassificationScore, ClassifierSettings, ColorClassifier,
    SignatureMasks, DEFAULT_AMBIGUITY_RATIO, DEFAULT_MIN_PIXELS, DEFAULT_ROI_MARGIN,
};
pub use palette::{
    ColorSignature, HsvRange, Material, Palette, RED_HIGH_RANGE, RED_LOW_RANGE, SAND_RANGE,
    STEEL_GRAY_RANGE, YELLOW_RANGE,
};
