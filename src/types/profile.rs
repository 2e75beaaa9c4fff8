use serde::{Deserialize, Serialize};

use super::AgentId;

pub const DEFAULT_AGENT_NAME: &str = "新進特務";
pub const INITIAL_CREDIBILITY: u8 = 50;
pub const MAX_CREDIBILITY: u8 = 100;
pub const COMPLETION_REWARD: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: AgentId,
    pub full_name: String,
    pub credibility_score: u8,
}

impl Profile {
    /// Profile row inserted for a freshly signed-up agent.
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            full_name: DEFAULT_AGENT_NAME.to_string(),
            credibility_score: INITIAL_CREDIBILITY,
        }
    }

    pub fn with_score(id: AgentId, full_name: String, score: i64) -> Self {
        Self {
            id,
            full_name,
            credibility_score: clamp_score(score),
        }
    }

    /// Score after one more completed mission.
    pub fn rewarded_score(&self) -> u8 {
        self.credibility_score
            .saturating_add(COMPLETION_REWARD)
            .min(MAX_CREDIBILITY)
    }
}

pub fn clamp_score(score: i64) -> u8 {
    score.clamp(0, MAX_CREDIBILITY as i64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_defaults() {
        let profile = Profile::new(AgentId::new_v4());
        assert_eq!(profile.full_name, DEFAULT_AGENT_NAME);
        assert_eq!(profile.credibility_score, 50);
    }

    #[test]
    fn test_reward_caps_at_hundred() {
        let mut profile = Profile::new(AgentId::new_v4());
        for _ in 0..10 {
            profile.credibility_score = profile.rewarded_score();
        }
        assert_eq!(profile.credibility_score, 100);
    }

    #[test]
    fn test_with_score_clamps() {
        let id = AgentId::new_v4();
        assert_eq!(Profile::with_score(id, "a".into(), -5).credibility_score, 0);
        assert_eq!(Profile::with_score(id, "a".into(), 250).credibility_score, 100);
    }
}
