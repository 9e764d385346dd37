//! Global colors.

use nu_ansi_term::Color;

/// The attention color.
pub(crate) const ATTENTION_COLOR: Color = Color::Red;

/// The color used to colorise the path.
pub(crate) const PATH_COLOR: Color = Color::LightBlue;

/// The color used for completed steps and found tools.
pub(crate) const SUCCESS_COLOR: Color = Color::Green;

/// The color used for warnings.
pub(crate) const WARN_COLOR: Color = Color::Yellow;
