// Constants for the MPL interpreter

/// Default grid width when none is configured
pub const DEFAULT_GRID_WIDTH: usize = 50;

/// Default grid height when none is configured
pub const DEFAULT_GRID_HEIGHT: usize = 50;

/// Nested function and rule calls allowed before the call is rejected.
/// Sized to fit a 2 MiB thread stack in debug builds.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Iterations a single loop may run before it is aborted
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 1_000_000;

/// Values of the standard constants for a `width × height` grid.
pub fn standard_constants(width: usize, height: usize) -> [(&'static str, f64); 5] {
    [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("TAU", std::f64::consts::TAU),
        ("GRID_WIDTH", width as f64),
        ("GRID_HEIGHT", height as f64),
    ]
}
