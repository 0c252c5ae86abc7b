// Telemetry data domain models
use serde::{Deserialize, Serialize};

/// Largest LiDAR range in centimetres that is still a real return.
pub const LIDAR_MAX_RANGE_CM: f64 = 30000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPosition {
    pub x: f64,
    pub y: f64,
    /// Heading in radians.
    pub r: f64,
}

impl RobotPosition {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarData {
    pub angle_inc: f64,
    /// Ranges in centimetres, one per angular step.
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LidarPoint {
    pub x: f64,
    pub y: f64,
}

impl LidarData {
    pub fn new(angle_inc: f64, data: Vec<f64>) -> Self {
        Self { angle_inc, data }
    }

    pub fn is_valid_range(distance_cm: f64) -> bool {
        distance_cm.is_finite() && distance_cm > 0.0 && distance_cm <= LIDAR_MAX_RANGE_CM
    }

    /// Returns points in metres in the robot frame, skipping sentinel ranges.
    pub fn local_points(&self) -> Vec<LidarPoint> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, d)| Self::is_valid_range(**d))
            .map(|(i, d)| {
                let angle = i as f64 * self.angle_inc;
                let meters = d / 100.0;
                LidarPoint {
                    x: meters * angle.cos(),
                    y: meters * angle.sin(),
                }
            })
            .collect()
    }

    /// Returns points in metres in the map frame of `pose`.
    pub fn world_points(&self, pose: &RobotPosition) -> Vec<LidarPoint> {
        let (sin_r, cos_r) = pose.r.sin_cos();
        self.local_points()
            .into_iter()
            .map(|p| LidarPoint {
                x: pose.x + p.x * cos_r - p.y * sin_r,
                y: pose.y + p.x * sin_r + p.y * cos_r,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    #[serde(default)]
    pub remain: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub sw_state: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetStatus {
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub if_name: Option<String>,
    #[serde(default)]
    pub rx_mb: Option<f64>,
    #[serde(default)]
    pub tx_mb: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub mem: Option<f64>,
    #[serde(default)]
    pub disk: Option<f64>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub net: Option<NetStatus>,
}

/// Battery and system snapshot. Each message replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemDataMessage {
    #[serde(default)]
    pub battery: Option<BatteryStatus>,
    #[serde(default)]
    pub system: Option<SystemStatus>,
}
