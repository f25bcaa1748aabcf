//! Motion sensor types and orientation remapping

/// A 3-axis motion sample
///
/// Accelerometer samples are in G, gyroscope samples in deg/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionData {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Physical orientation the pad is held in
///
/// Phones and single Joy-Cons are often held sideways; the motion axes
/// must be remapped so the emulator still sees a pad-frame reading. The
/// remap differs between accelerometer and gyroscope because flipping a
/// rotation axis also flips the sign of the rotation around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOrientation {
    #[default]
    Normal,
    SidewaysLeft,
    SidewaysRight,
    Inverted,
}

impl DeviceOrientation {
    /// Remap an accelerometer sample into the pad frame
    #[inline]
    pub fn apply_accel(self, m: MotionData) -> MotionData {
        match self {
            Self::Normal => m,
            Self::SidewaysLeft => MotionData::new(m.z, m.y, -m.x),
            Self::SidewaysRight => MotionData::new(-m.z, m.y, m.x),
            Self::Inverted => MotionData::new(-m.x, m.y, -m.z),
        }
    }

    /// Remap a gyroscope sample into the pad frame
    #[inline]
    pub fn apply_gyro(self, m: MotionData) -> MotionData {
        match self {
            Self::Normal => m,
            Self::SidewaysLeft => MotionData::new(-m.z, m.y, m.x),
            Self::SidewaysRight => MotionData::new(m.z, m.y, -m.x),
            Self::Inverted => MotionData::new(-m.x, m.y, -m.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: MotionData = MotionData {
        x: 1.0,
        y: 2.0,
        z: 3.0,
    };

    #[test]
    fn test_normal_is_identity() {
        assert_eq!(DeviceOrientation::Normal.apply_accel(SAMPLE), SAMPLE);
        assert_eq!(DeviceOrientation::Normal.apply_gyro(SAMPLE), SAMPLE);
    }

    #[test]
    fn test_sideways_left() {
        assert_eq!(
            DeviceOrientation::SidewaysLeft.apply_accel(SAMPLE),
            MotionData::new(3.0, 2.0, -1.0)
        );
        assert_eq!(
            DeviceOrientation::SidewaysLeft.apply_gyro(SAMPLE),
            MotionData::new(-3.0, 2.0, 1.0)
        );
    }

    #[test]
    fn test_sideways_right() {
        assert_eq!(
            DeviceOrientation::SidewaysRight.apply_accel(SAMPLE),
            MotionData::new(-3.0, 2.0, 1.0)
        );
        assert_eq!(
            DeviceOrientation::SidewaysRight.apply_gyro(SAMPLE),
            MotionData::new(3.0, 2.0, -1.0)
        );
    }

    #[test]
    fn test_inverted() {
        let expected = MotionData::new(-1.0, 2.0, -3.0);
        assert_eq!(DeviceOrientation::Inverted.apply_accel(SAMPLE), expected);
        assert_eq!(DeviceOrientation::Inverted.apply_gyro(SAMPLE), expected);
    }

    #[test]
    fn test_sideways_transforms_are_inverses() {
        // Holding the pad the other way round undoes the remap
        let left = DeviceOrientation::SidewaysLeft.apply_accel(SAMPLE);
        assert_eq!(DeviceOrientation::SidewaysRight.apply_accel(left), SAMPLE);
    }
}
