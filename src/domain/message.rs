// Data-channel message model: tagged inbound messages and outbound commands
use super::flow::FlowState;
use super::telemetry::{LidarData, RobotPosition, SystemDataMessage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outbound command. An untyped key/value bag sent verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Map<String, Value>);

impl Command {
    pub fn new(module: &str, class: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("m".to_string(), Value::from(module));
        fields.insert("c".to_string(), Value::from(class));
        Self(fields)
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn module(&self) -> Option<&str> {
        self.get("m").and_then(Value::as_str)
    }

    pub fn class(&self) -> Option<&str> {
        self.get("c").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Odometry,
    Lidar,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Odometry => "lc_odometry",
            Topic::Lidar => "lidar",
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "odometry" | "lc_odometry" => Ok(Topic::Odometry),
            "lidar" => Ok(Topic::Lidar),
            other => Err(format!("unknown topic {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeInterval {
    Realtime,
    Millis(u64),
}

impl From<SubscribeInterval> for Value {
    fn from(interval: SubscribeInterval) -> Self {
        match interval {
            SubscribeInterval::Realtime => Value::from("realtime"),
            SubscribeInterval::Millis(ms) => Value::from(ms),
        }
    }
}

pub mod commands {
    use super::{Command, SubscribeInterval, Topic};

    pub fn subscribe(topic: Topic, interval: SubscribeInterval) -> Command {
        Command::new("sys", "subscribe")
            .with("topic", topic.as_str())
            .with("interval", interval)
    }

    pub fn unsubscribe(topic: Topic) -> Command {
        Command::new("sys", "unsubscribe").with("topic", topic.as_str())
    }

    pub fn flow_start(flow_id: &str) -> Command {
        Command::new("flow", "flow_start").with("flow_id", flow_id)
    }

    pub fn flow_stop() -> Command {
        Command::new("flow", "flow_stop")
    }

    pub fn flow_pause() -> Command {
        Command::new("flow", "flow_pause")
    }

    pub fn flow_resume() -> Command {
        Command::new("flow", "flow_resume")
    }

    pub fn zero_velocity() -> Command {
        Command::new("lc", "lc_velocity")
            .with("linear", 0.0)
            .with("angular", 0.0)
    }

    pub fn emergency_stop() -> Command {
        Command::new("sys", "emergency_stop")
    }
}

/// Result of inspecting the `m`/`c` tags of an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Position(RobotPosition),
    Lidar(LidarData),
    /// Odometry or LiDAR message missing required fields.
    Incomplete,
    /// Left for the auto-subscribed feed.
    Passthrough(Value),
}

fn tags(value: &Value) -> (Option<&str>, Option<&str>) {
    (
        value.get("m").and_then(Value::as_str),
        value.get("c").and_then(Value::as_str),
    )
}

pub fn classify(value: Value) -> Inbound {
    let (is_odometry, is_lidar) = match tags(&value) {
        (Some("lc"), Some("lc_odometry")) => (true, false),
        (Some("lidar"), _) => (false, true),
        _ => (false, false),
    };

    if is_odometry {
        let field = |k: &str| value.get(k).and_then(Value::as_f64);
        return match (field("x"), field("y"), field("r")) {
            (Some(x), Some(y), Some(r)) => Inbound::Position(RobotPosition::new(x, y, r)),
            _ => Inbound::Incomplete,
        };
    }

    if is_lidar {
        let angle_inc = value.get("angle_inc").and_then(Value::as_f64);
        let data = value.get("data").and_then(Value::as_array);
        return match (angle_inc, data) {
            (Some(angle_inc), Some(data)) => {
                // Non-numeric entries become the 0 sentinel to keep indices aligned
                let ranges = data.iter().map(|d| d.as_f64().unwrap_or(0.0)).collect();
                Inbound::Lidar(LidarData::new(angle_inc, ranges))
            }
            _ => Inbound::Incomplete,
        };
    }

    Inbound::Passthrough(value)
}

/// Messages the auto-subscribed feed republishes.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    System(SystemDataMessage),
    Flow(FlowState),
    Other,
}

pub fn classify_feed(value: &Value) -> FeedMessage {
    let (module, class) = tags(value);
    let carries_system = value.get("battery").is_some_and(Value::is_object)
        || value.get("system").is_some_and(Value::is_object);

    if (module == Some("sys") && class == Some("sys_data")) || carries_system {
        return match SystemDataMessage::deserialize(value) {
            Ok(msg) => FeedMessage::System(msg),
            Err(e) => {
                tracing::debug!("Malformed system data message: {}", e);
                FeedMessage::Other
            }
        };
    }

    if module == Some("flow") && class == Some("flow_state") {
        return match FlowState::deserialize(value) {
            Ok(state) => FeedMessage::Flow(state),
            Err(e) => {
                tracing::debug!("Malformed flow state message: {}", e);
                FeedMessage::Other
            }
        };
    }

    FeedMessage::Other
}
