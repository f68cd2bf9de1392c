//! C-compatible Foreign Function Interface (FFI) for butterfly-batch
//!
//! Exposes the route-shape geometry to C, C++, Python (via ctypes) and other
//! languages that can call C libraries.
//!
//! # Memory Management
//!
//! - Coordinates are flat `double` buffers of `[lon, lat, lon, lat, ...]`
//! - The caller owns every buffer; the library never allocates memory it
//!   hands back
//! - `out_count` receives the number of points (not doubles) written
//!
//! # Error Handling
//!
//! All functions return a ButterflyResult code:
//! - 0: Success
//! - 1: Invalid parameter
//! - 2: Output buffer too small

use std::os::raw::c_char;

use crate::core::types::Location;
use crate::geometry::{self, JoinPolicy, OffsetOptions, Side};

/// Result codes for C FFI
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButterflyResult {
    Success = 0,
    InvalidParameter = 1,
    BufferTooSmall = 2,
}

/// Read `count` points from a flat coordinate buffer
///
/// # Safety
/// `coords` must point to at least `count * 2` readable doubles.
unsafe fn read_points(coords: *const f64, count: usize) -> Option<Vec<Location>> {
    if count == 0 {
        return Some(Vec::new());
    }
    if coords.is_null() {
        return None;
    }
    let len = count.checked_mul(2)?;
    let flat = std::slice::from_raw_parts(coords, len);
    Some(
        flat.chunks_exact(2)
            .map(|pair| Location::new(pair[0], pair[1]))
            .collect(),
    )
}

/// Copy points into a caller buffer holding `capacity` points
///
/// # Safety
/// `out` must point to at least `capacity * 2` writable doubles and
/// `out_count` must be a valid pointer.
unsafe fn write_points(
    points: &[Location],
    out: *mut f64,
    capacity: usize,
    out_count: *mut usize,
) -> ButterflyResult {
    *out_count = points.len();
    if points.len() > capacity {
        return ButterflyResult::BufferTooSmall;
    }
    if points.is_empty() {
        return ButterflyResult::Success;
    }
    if out.is_null() {
        return ButterflyResult::InvalidParameter;
    }
    let flat = std::slice::from_raw_parts_mut(out, points.len() * 2);
    for (slot, point) in flat.chunks_exact_mut(2).zip(points) {
        slot[0] = point.lon;
        slot[1] = point.lat;
    }
    ButterflyResult::Success
}

/// Simplify a line with Douglas-Peucker
///
/// # Parameters
/// - `coords`: input buffer of `count` points
/// - `count`: number of input points
/// - `epsilon`: tolerance in degrees
/// - `out`: output buffer with room for `count` points (the result never grows)
/// - `out_count`: receives the number of points written
///
/// # Returns
/// ButterflyResult code
///
/// # Safety
/// Buffers must be valid for the sizes given.
#[no_mangle]
pub unsafe extern "C" fn butterfly_simplify(
    coords: *const f64,
    count: usize,
    epsilon: f64,
    out: *mut f64,
    out_count: *mut usize,
) -> ButterflyResult {
    if out_count.is_null() {
        return ButterflyResult::InvalidParameter;
    }
    let points = match read_points(coords, count) {
        Some(points) => points,
        None => return ButterflyResult::InvalidParameter,
    };

    let simplified = geometry::simplify(&points, epsilon);
    write_points(&simplified, out, count, out_count)
}

/// Offset a line sideways
///
/// # Parameters
/// - `coords`: input buffer of `count` points
/// - `count`: number of input points
/// - `distance`: offset distance in metres
/// - `side`: `1` for right, `-1` for left of the travel direction
/// - `join_always`: non-zero to join every non-parallel junction, zero to
///   skip joins at near reversals
/// - `out`: output buffer holding `out_capacity` points; `2 * count` always suffices
/// - `out_count`: receives the number of points produced, also when the
///   buffer is too small
///
/// # Returns
/// ButterflyResult code
///
/// # Safety
/// Buffers must be valid for the sizes given.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn butterfly_offset(
    coords: *const f64,
    count: usize,
    distance: f64,
    side: i32,
    join_always: i32,
    out: *mut f64,
    out_capacity: usize,
    out_count: *mut usize,
) -> ButterflyResult {
    if out_count.is_null() || !distance.is_finite() {
        return ButterflyResult::InvalidParameter;
    }
    let side = match side {
        1 => Side::Right,
        -1 => Side::Left,
        _ => return ButterflyResult::InvalidParameter,
    };
    let join = if join_always != 0 {
        JoinPolicy::Always
    } else {
        JoinPolicy::AngleGated
    };
    let points = match read_points(coords, count) {
        Some(points) => points,
        None => return ButterflyResult::InvalidParameter,
    };

    let options = OffsetOptions::new(distance, side).with_join(join);
    let shifted = geometry::offset(&points, &options);
    write_points(&shifted, out, out_capacity, out_count)
}

/// Get library version string
///
/// # Returns
/// Static string with version information (does not need to be freed)
#[no_mangle]
pub extern "C" fn butterfly_version() -> *const c_char {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<std::ffi::CString> = OnceLock::new();

    VERSION_STRING
        .get_or_init(|| {
            std::ffi::CString::new(format!("butterfly-batch {}", env!("BUTTERFLY_VERSION")))
                .unwrap_or_default()
        })
        .as_ptr()
}
