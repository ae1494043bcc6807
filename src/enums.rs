#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

/// How border voxels introduced by padding are filled.
///
/// The modes follow the usual array-padding conventions, including pad widths
/// wider than the padded axis, where the extension simply keeps repeating.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaddingMode<A = f32> {
    /// Replicate the nearest edge voxel.
    Edge,
    /// Fill with a fixed value.
    Constant(A),
    /// Mirror about the edge voxel without repeating it: `3 2 | 1 2 3 | 2 1`.
    Reflect,
    /// Mirror including the edge voxel: `2 1 | 1 2 3 | 3 2`.
    Symmetric,
    /// Periodic continuation: `2 3 | 1 2 3 | 1 2`.
    Wrap,
}

impl<A> Default for PaddingMode<A> {
    fn default() -> Self {
        PaddingMode::Edge
    }
}

impl<A> PaddingMode<A> {
    /// Maps a possibly out-of-range `index` onto `0..len`.
    ///
    /// Returns `None` for an empty axis, and for out-of-range indices in
    /// [`PaddingMode::Constant`] mode where the voxel takes the fill value.
    pub(crate) fn source_index(&self, index: isize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let n = len as isize;
        if (0..n).contains(&index) {
            return Some(index as usize);
        }

        match self {
            PaddingMode::Constant(_) => None,
            PaddingMode::Edge => Some(index.clamp(0, n - 1) as usize),
            PaddingMode::Reflect => Some(reflect_index(index, len)),
            PaddingMode::Symmetric => {
                let period = 2 * n;
                let m = index.rem_euclid(period);
                Some((if m >= n { period - 1 - m } else { m }) as usize)
            }
            PaddingMode::Wrap => Some(index.rem_euclid(n) as usize),
        }
    }
}

/// Whole-sample mirror of `index` onto `0..len` (period `2 * len - 2`).
///
/// `len` must be non-zero.
#[inline]
pub(crate) fn reflect_index(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    let period = 2 * (n - 1);
    let m = index.rem_euclid(period);
    if m >= n { (period - m) as usize } else { m as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extend(mode: PaddingMode, len: usize, range: std::ops::Range<isize>) -> Vec<Option<usize>> {
        range.map(|i| mode.source_index(i, len)).collect()
    }

    #[test]
    fn edge_clamps_to_the_border() {
        let got = extend(PaddingMode::Edge, 3, -2..5);
        let want = [0, 0, 0, 1, 2, 2, 2].map(Some);
        assert_eq!(got, want);
    }

    #[test]
    fn constant_leaves_outside_unmapped() {
        let got = extend(PaddingMode::Constant(-1000.0), 3, -1..4);
        assert_eq!(got, vec![None, Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn reflect_skips_the_edge_voxel() {
        let got = extend(PaddingMode::Reflect, 3, -5..8);
        let want = [1, 0, 1, 2, 1, 0, 1, 2, 1, 0, 1, 2, 1].map(Some);
        assert_eq!(got, want);
    }

    #[test]
    fn symmetric_repeats_the_edge_voxel() {
        let got = extend(PaddingMode::Symmetric, 3, -4..7);
        let want = [2, 2, 1, 0, 0, 1, 2, 2, 1, 0, 0].map(Some);
        assert_eq!(got, want);
    }

    #[test]
    fn wrap_is_periodic() {
        let got = extend(PaddingMode::Wrap, 3, -4..6);
        let want = [2, 0, 1, 2, 0, 1, 2, 0, 1, 2].map(Some);
        assert_eq!(got, want);
    }

    #[test]
    fn single_voxel_axis_extends_with_itself() {
        for mode in [
            PaddingMode::Edge,
            PaddingMode::Reflect,
            PaddingMode::Symmetric,
            PaddingMode::Wrap,
        ] {
            assert_eq!(extend(mode, 1, -3..4), vec![Some(0); 7], "{mode:?}");
        }
    }

    #[test]
    fn empty_axis_has_no_source() {
        assert_eq!(PaddingMode::<f32>::Edge.source_index(0, 0), None);
    }
}
