use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Morphology of a TRON1 robot, resolved once from a robot type code such as
/// `PF_TRON1A`. Matching is by case-sensitive prefix, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotFamily {
    PointFoot,
    WheelFoot,
    SoleFoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown robot type '{0}' (expected a PF*, WF* or SF* code)")]
pub struct UnknownRobotType(pub String);

impl RobotFamily {
    const PREFIXES: [(&'static str, RobotFamily); 3] = [
        ("PF", RobotFamily::PointFoot),
        ("WF", RobotFamily::WheelFoot),
        ("SF", RobotFamily::SoleFoot),
    ];

    pub fn from_robot_type(robot_type: &str) -> Result<Self, UnknownRobotType> {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| robot_type.starts_with(prefix))
            .map(|(_, family)| *family)
            .ok_or_else(|| UnknownRobotType(robot_type.to_string()))
    }

    pub fn prefix(self) -> &'static str {
        match self {
            RobotFamily::PointFoot => "PF",
            RobotFamily::WheelFoot => "WF",
            RobotFamily::SoleFoot => "SF",
        }
    }

    /// Actuated joints: three per leg, plus a wheel (WF) or an ankle (SF) per leg.
    pub fn joint_count(self) -> usize {
        match self {
            RobotFamily::PointFoot => 6,
            RobotFamily::WheelFoot | RobotFamily::SoleFoot => 8,
        }
    }

    /// Indices of velocity-controlled wheel joints.
    pub fn wheel_joints(self) -> &'static [usize] {
        match self {
            RobotFamily::WheelFoot => &[3, 7],
            RobotFamily::PointFoot | RobotFamily::SoleFoot => &[],
        }
    }
}

impl fmt::Display for RobotFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RobotFamily::PointFoot => "point-foot",
            RobotFamily::WheelFoot => "wheel-foot",
            RobotFamily::SoleFoot => "sole-foot",
        };
        f.write_str(name)
    }
}

/// Training framework whose policy/parameter layout the controller loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RlBackend {
    IsaacGym,
    IsaacLab,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RL_TYPE {0} is not supported, choose between 'isaacgym' and 'isaaclab'")]
pub struct UnknownRlBackend(pub String);

impl RlBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            RlBackend::IsaacGym => "isaacgym",
            RlBackend::IsaacLab => "isaaclab",
        }
    }
}

impl FromStr for RlBackend {
    type Err = UnknownRlBackend;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isaacgym" => Ok(RlBackend::IsaacGym),
            "isaaclab" => Ok(RlBackend::IsaacLab),
            other => Err(UnknownRlBackend(other.to_string())),
        }
    }
}

impl fmt::Display for RlBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK robot instance kind named in the ability host's system config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RobotModel {
    PointFoot,
    Wheellegged,
}

impl RobotModel {
    /// Motor count reported by the simulated robot for this model.
    pub fn motor_number(self) -> u32 {
        match self {
            RobotModel::PointFoot => 6,
            RobotModel::Wheellegged => 16,
        }
    }
}

impl fmt::Display for RobotModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RobotModel::PointFoot => "PointFoot",
            RobotModel::Wheellegged => "Wheellegged",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_prefix() {
        assert_eq!(RobotFamily::from_robot_type("PF-X1"), Ok(RobotFamily::PointFoot));
        assert_eq!(RobotFamily::from_robot_type("WF-X1"), Ok(RobotFamily::WheelFoot));
        assert_eq!(RobotFamily::from_robot_type("SF-X1"), Ok(RobotFamily::SoleFoot));
        assert_eq!(
            RobotFamily::from_robot_type("PF_TRON1A"),
            Ok(RobotFamily::PointFoot)
        );
    }

    #[test]
    fn test_family_is_case_sensitive_and_prefix_only() {
        assert!(RobotFamily::from_robot_type("pf-X1").is_err());
        assert!(RobotFamily::from_robot_type("X-PF1").is_err());
        assert!(RobotFamily::from_robot_type("").is_err());
        let err = RobotFamily::from_robot_type("ZZ-X1").unwrap_err();
        assert_eq!(err.0, "ZZ-X1");
        assert!(err.to_string().contains("ZZ-X1"));
    }

    #[test]
    fn test_rl_backend_exact_match() {
        assert_eq!("isaacgym".parse::<RlBackend>(), Ok(RlBackend::IsaacGym));
        assert_eq!("isaaclab".parse::<RlBackend>(), Ok(RlBackend::IsaacLab));
        assert!("IsaacGym".parse::<RlBackend>().is_err());
        assert!("isaaclab ".parse::<RlBackend>().is_err());
        assert!("mujoco".parse::<RlBackend>().is_err());
    }

    #[test]
    fn test_joint_layout() {
        assert_eq!(RobotFamily::PointFoot.joint_count(), 6);
        assert_eq!(RobotFamily::WheelFoot.joint_count(), 8);
        assert_eq!(RobotFamily::SoleFoot.joint_count(), 8);
        assert_eq!(RobotFamily::WheelFoot.wheel_joints(), &[3, 7]);
        assert!(RobotFamily::SoleFoot.wheel_joints().is_empty());
    }
}
