/// CT display window given by level and width, both in Hounsfield units.
///
/// Read-only; build a new window to change its parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CtWindow {
    level: f32,
    width: f32,
}

impl CtWindow {
    /// `None` unless `width` is positive and both values are finite.
    pub fn new(level: f32, width: f32) -> Option<CtWindow> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// Lung window, level -600 HU and width 1500 HU.
    #[inline]
    pub const fn lung() -> CtWindow {
        Self {
            level: -600.0,
            width: 1500.0,
        }
    }

    /// Mediastinal soft-tissue window, level 40 HU and width 400 HU.
    #[inline]
    pub const fn mediastinum() -> CtWindow {
        Self {
            level: 40.0,
            width: 400.0,
        }
    }

    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Gray value of `hu` under this window. NaN maps to black.
    pub fn eval(&self, hu: f32) -> u8 {
        if hu.is_nan() {
            return u8::MIN;
        }
        let lb = self.lower_bound();
        if hu <= lb {
            u8::MIN
        } else if hu >= self.upper_bound() {
            u8::MAX
        } else {
            (((hu - lb) / self.width) * 255.0) as u8
        }
    }
}

impl Default for CtWindow {
    fn default() -> Self {
        Self::lung()
    }
}

#[cfg(test)]
mod tests {
    use super::CtWindow;

    #[test]
    fn rejects_degenerate_windows() {
        assert!(CtWindow::new(0.0, -1.0).is_none());
        assert!(CtWindow::new(0.0, 0.0).is_none());
        assert!(CtWindow::new(f32::NAN, 100.0).is_none());
        assert!(CtWindow::new(0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn maps_hounsfield_units_to_gray() {
        // [60, 100]
        let window = CtWindow::new(80.0, 40.0).unwrap();
        assert_eq!(window.eval(f32::NAN), 0);
        assert_eq!(window.eval(f32::MIN), 0);
        assert_eq!(window.eval(f32::MAX), 255);
        assert_eq!(window.eval(60.0), 0);
        assert_eq!(window.eval(70.0), (255.0 * 0.25) as u8);
        assert_eq!(window.eval(80.0), (255.0 * 0.5) as u8);
        assert_eq!(window.eval(99.999), 254);
        assert_eq!(window.eval(100.0), 255);
    }

    #[test]
    fn lung_window_bounds() {
        let window = CtWindow::lung();
        assert_eq!(window.lower_bound(), -1350.0);
        assert_eq!(window.upper_bound(), 150.0);
    }
}
