// orientation.rs — pitch / yaw / roll state and its rotation matrix
//
// World frame: +Y up (north pole), +Z forward (longitude 0, image centre),
// +X east (longitude +90°). Positive pitch tilts up, positive yaw turns east,
// positive roll turns +X towards +Y.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Wraps an angle in degrees into `[-180, 180]`, keeping the sign of the input
/// for values already inside the range. Non-finite input collapses to 0.
pub fn wrap_degrees(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let r = angle % 360.0;
    if r > 180.0 {
        r - 360.0
    } else if r < -180.0 {
        r + 360.0
    } else {
        r
    }
}

/// A normalized 3-axis rotation in degrees.
///
/// Applied to a direction as: pitch about X, then yaw about Y, then roll
/// about Z. Values are snapshots; mutate by building a new one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "OrientationMetadata")]
pub struct Orientation {
    pitch: f64,
    yaw: f64,
    roll: f64,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }.normalized()
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn normalized(self) -> Self {
        Self {
            pitch: wrap_degrees(self.pitch),
            yaw: wrap_degrees(self.yaw),
            roll: wrap_degrees(self.roll),
        }
    }

    /// Returns a copy offset by the given deltas (degrees), re-normalized.
    pub fn rotated(self, d_pitch: f64, d_yaw: f64, d_roll: f64) -> Self {
        Self::new(self.pitch + d_pitch, self.yaw + d_yaw, self.roll + d_roll)
    }

    pub fn with_pitch(self, pitch: f64) -> Self {
        Self::new(pitch, self.yaw, self.roll)
    }

    pub fn with_yaw(self, yaw: f64) -> Self {
        Self::new(self.pitch, yaw, self.roll)
    }

    pub fn with_roll(self, roll: f64) -> Self {
        Self::new(self.pitch, self.yaw, roll)
    }

    pub fn is_identity(&self) -> bool {
        self.pitch == 0.0 && self.yaw == 0.0 && self.roll == 0.0
    }

    /// Composed rotation `Rz(roll) · Ry(yaw) · Rx(-pitch)`.
    pub fn to_rotation_matrix(&self) -> DMat3 {
        DMat3::from_rotation_z(self.roll.to_radians())
            * DMat3::from_rotation_y(self.yaw.to_radians())
            * DMat3::from_rotation_x(-self.pitch.to_radians())
    }

    pub fn rotate(&self, direction: DVec3) -> DVec3 {
        self.to_rotation_matrix() * direction
    }

    /// Applies the transpose, which is the inverse for an orthonormal matrix.
    pub fn inverse_rotate(&self, direction: DVec3) -> DVec3 {
        self.to_rotation_matrix().transpose() * direction
    }
}

/// Orientation record as stored beside captures. Missing angles read as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationMetadata {
    pub pitch: Option<f64>,
    pub yaw: Option<f64>,
    pub roll: Option<f64>,
    pub position: Option<[f64; 3]>,
}

impl OrientationMetadata {
    /// Parses either the object form (`{"pitch": .., "yaw": .., "roll": ..}`)
    /// or a bare `[pitch, yaw, roll]` triple.
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Record {
            Triple([f64; 3]),
            Fields(OrientationMetadata),
        }

        let record: Record =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(match record {
            Record::Triple([pitch, yaw, roll]) => OrientationMetadata {
                pitch: Some(pitch),
                yaw: Some(yaw),
                roll: Some(roll),
                position: None,
            },
            Record::Fields(fields) => fields,
        })
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(
            self.pitch.unwrap_or(0.0),
            self.yaw.unwrap_or(0.0),
            self.roll.unwrap_or(0.0),
        )
    }
}

impl From<OrientationMetadata> for Orientation {
    fn from(meta: OrientationMetadata) -> Self {
        meta.orientation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn assert_vec(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn wraps_into_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), -180.0);
        assert_eq!(wrap_degrees(270.0), -90.0);
        assert_eq!(wrap_degrees(-270.0), 90.0);
        assert_eq!(wrap_degrees(540.0), 180.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
        assert_eq!(wrap_degrees(-725.0), -5.0);
        assert_eq!(wrap_degrees(f64::NAN), 0.0);
    }

    #[test]
    fn single_axis_setters_keep_the_others() {
        let o = Orientation::new(10.0, 20.0, 30.0);
        assert_eq!(o.with_pitch(-5.0), Orientation::new(-5.0, 20.0, 30.0));
        assert_eq!(o.with_yaw(200.0), Orientation::new(10.0, -160.0, 30.0));
        assert_eq!(o.with_roll(0.0), Orientation::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn constructor_normalizes() {
        let o = Orientation::new(370.0, -190.0, 90.0);
        assert!((o.pitch() - 10.0).abs() < EPS);
        assert!((o.yaw() - 170.0).abs() < EPS);
        assert_eq!(o.roll(), 90.0);
    }

    #[test]
    fn yaw_turns_forward_east() {
        let o = Orientation::new(0.0, 90.0, 0.0);
        assert_vec(o.rotate(DVec3::Z), DVec3::X);
    }

    #[test]
    fn pitch_tilts_forward_up() {
        let o = Orientation::new(90.0, 0.0, 0.0);
        assert_vec(o.rotate(DVec3::Z), DVec3::Y);
        let o = Orientation::new(-45.0, 0.0, 0.0);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_vec(o.rotate(DVec3::Z), DVec3::new(0.0, -h, h));
    }

    #[test]
    fn roll_turns_east_towards_up() {
        let o = Orientation::new(0.0, 0.0, 90.0);
        assert_vec(o.rotate(DVec3::X), DVec3::Y);
    }

    #[test]
    fn pitch_applies_before_yaw() {
        // Tilt up 45°, then turn east: the ray stays 45° above the horizon.
        let o = Orientation::new(45.0, 90.0, 0.0);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_vec(o.rotate(DVec3::Z), DVec3::new(h, h, 0.0));
    }

    #[test]
    fn inverse_undoes_rotate() {
        let o = Orientation::new(23.0, -131.0, 57.5);
        let d = DVec3::new(0.3, -0.4, 0.8).normalize();
        assert_vec(o.inverse_rotate(o.rotate(d)), d);
        assert_vec(o.rotate(o.inverse_rotate(d)), d);
    }

    #[test]
    fn metadata_defaults_missing_fields() {
        let meta = OrientationMetadata::from_json(r#"{"yaw": 400}"#).unwrap();
        let o = meta.orientation();
        assert_eq!(o, Orientation::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn metadata_accepts_triple_and_position() {
        let o = OrientationMetadata::from_json("[10, 20, 30]").unwrap().orientation();
        assert_eq!(o, Orientation::new(10.0, 20.0, 30.0));

        let meta = OrientationMetadata::from_json(
            r#"{"pitch": -5, "yaw": 1, "roll": 2, "position": [1.0, 2.0, 3.0]}"#,
        )
        .unwrap();
        assert_eq!(meta.position, Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn metadata_rejects_garbage() {
        let err = OrientationMetadata::from_json("not json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn deserializes_through_metadata() {
        let o: Orientation = serde_json::from_str(r#"{"pitch": 190}"#).unwrap();
        assert_eq!(o, Orientation::new(-170.0, 0.0, 0.0));
    }
}
