pub mod contour;
pub mod emphasis;
pub mod framing;
pub mod intensity;
pub mod lpc;
pub mod pitch;
pub mod resample;
pub mod windowing;
