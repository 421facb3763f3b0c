//! Rolling statistics primitives shared by the indicator and collapse-field engines.

pub mod ewma;
pub mod rolling_window;
pub mod wilder;

pub use ewma::Ewma;
pub use rolling_window::RollingWindow;
pub use wilder::WilderSmoother;
