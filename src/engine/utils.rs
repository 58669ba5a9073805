use super::ItemInternal;
use crate::geometry::Vec2;

/// Index of the last-drawn item under `point` among those passing `filter`.
pub(super) fn topmost_at(
    items: &[ItemInternal],
    point: Vec2,
    filter: impl Fn(&ItemInternal) -> bool,
) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .rev()
        .find(|(_, item)| filter(*item) && item.body.rect().contains(point))
        .map(|(idx, _)| idx)
}

/// Normalises an angle in degrees to `0..360`.
pub(super) fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_degrees_stays_in_range() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
    }
}
