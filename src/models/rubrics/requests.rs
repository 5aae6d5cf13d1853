use serde::Deserialize;
use ts_rs::TS;

use crate::errors::{PeerReviewError, Result};

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct CreatePerformanceLevelRequest {
    pub points: f64,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct CreateCriterionRequest {
    pub name: String,
    pub description: Option<String>,
    pub weight: f64,
    pub max_points: f64,
    #[serde(default)]
    pub levels: Vec<CreatePerformanceLevelRequest>,
}

// 创建评分量规请求，维度与等级按数组顺序保存
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct CreateRubricRequest {
    pub title: String,
    pub criteria: Vec<CreateCriterionRequest>,
}

impl CreateRubricRequest {
    /// 校验量规结构
    ///
    /// - 标题与维度名称非空，至少一个维度
    /// - 权重为非负有限值，满分为正有限值
    /// - 每个表现等级的分数在 [0, max_points]
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PeerReviewError::validation("Rubric title must not be empty"));
        }
        if self.criteria.is_empty() {
            return Err(PeerReviewError::validation(
                "Rubric must contain at least one criterion",
            ));
        }

        for criterion in &self.criteria {
            if criterion.name.trim().is_empty() {
                return Err(PeerReviewError::validation(
                    "Criterion name must not be empty",
                ));
            }
            if !criterion.weight.is_finite() || criterion.weight < 0.0 {
                return Err(PeerReviewError::validation(format!(
                    "Criterion '{}' has an invalid weight: {}",
                    criterion.name, criterion.weight
                )));
            }
            if !criterion.max_points.is_finite() || criterion.max_points <= 0.0 {
                return Err(PeerReviewError::validation(format!(
                    "Criterion '{}' must have positive max points",
                    criterion.name
                )));
            }
            for level in &criterion.levels {
                if !level.points.is_finite()
                    || level.points < 0.0
                    || level.points > criterion.max_points
                {
                    return Err(PeerReviewError::validation(format!(
                        "Performance level '{}' of criterion '{}' has {} points, allowed range is [0, {}]",
                        level.description, criterion.name, level.points, criterion.max_points
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(levels: Vec<f64>) -> CreateRubricRequest {
        CreateRubricRequest {
            title: "Lab report".to_string(),
            criteria: vec![CreateCriterionRequest {
                name: "Clarity".to_string(),
                description: None,
                weight: 1.0,
                max_points: 10.0,
                levels: levels
                    .into_iter()
                    .map(|points| CreatePerformanceLevelRequest {
                        points,
                        description: format!("{points} points"),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_valid_rubric() {
        assert!(request(vec![0.0, 5.0, 10.0]).validate().is_ok());
    }

    #[test]
    fn test_level_above_max_points_is_rejected() {
        let err = request(vec![5.0, 12.0]).validate().unwrap_err();
        assert_eq!(err.code(), "E005");
        assert!(err.message().contains("Clarity"));
    }

    #[test]
    fn test_negative_level_is_rejected() {
        assert!(request(vec![-1.0]).validate().is_err());
    }

    #[test]
    fn test_empty_criteria_is_rejected() {
        let req = CreateRubricRequest {
            title: "Empty".to_string(),
            criteria: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut req = request(vec![]);
        req.criteria[0].weight = -0.5;
        assert!(req.validate().is_err());
    }
}
