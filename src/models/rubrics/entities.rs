use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 表现等级：某个评分维度下的离散得分档位
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct PerformanceLevel {
    pub id: i64,
    pub criterion_id: i64,
    pub points: f64,
    pub description: String,
    pub position: i32,
}

/// 评分维度
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct Criterion {
    pub id: i64,
    pub rubric_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub weight: f64,
    pub max_points: f64,
    pub position: i32,
    pub levels: Vec<PerformanceLevel>,
}

impl Criterion {
    /// 分数必须是有限值且落在 [0, max_points]
    pub fn accepts(&self, score: f64) -> bool {
        score.is_finite() && (0.0..=self.max_points).contains(&score)
    }
}

/// 评分量规，维度按 position 排序
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/rubric.ts")]
pub struct Rubric {
    pub id: i64,
    pub title: String,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn criterion(&self, criterion_id: i64) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == criterion_id)
    }

    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }

    /// 按总权重归一化的加权总分
    ///
    /// `Σ(score_i × weight_i) / Σ weight_j`，分母为量规全部维度的权重之和，
    /// 未评分的维度按 0 分计入。总权重为 0 时返回 `None`。
    pub fn weighted_total(&self, scores: &HashMap<i64, f64>) -> Option<f64> {
        let total_weight = self.total_weight();
        if total_weight <= 0.0 {
            return None;
        }

        let weighted_sum: f64 = self
            .criteria
            .iter()
            .filter_map(|c| scores.get(&c.id).map(|score| score * c.weight))
            .sum();

        Some(weighted_sum / total_weight)
    }
}
