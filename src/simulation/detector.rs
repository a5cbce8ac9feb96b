//! Flow detector crossing predicate
//!
//! A single implementation shared by the cyclic and open-lane counting
//! paths of every model variant.

/// Returns true when a vehicle moving `velocity` cells forward from
/// `from` departs the detector cell during this tick.
///
/// The vehicle visits `from, from + 1, ..., from + velocity` (modulo the
/// road length when cyclic). It has passed the detector when the detector
/// cell is among the visited cells with at least one more cell after it,
/// i.e. the vehicle leaves the detector going forward. Landing exactly on
/// the detector does not count; that passage is recorded on the tick the
/// vehicle departs.
pub fn did_cross(
    from: usize,
    velocity: u32,
    detector: usize,
    road_length: usize,
    cyclic: bool,
) -> bool {
    for offset in 0..velocity as usize {
        let visited = if cyclic {
            (from + offset) % road_length
        } else {
            from + offset
        };
        if visited == detector {
            return true;
        }
    }
    false
}
