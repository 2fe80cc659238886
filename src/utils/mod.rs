pub(crate) mod window;

pub(crate) use window::{RangePreset, resolve_window};
