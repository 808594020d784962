//! Points rules and achievement definitions

use sqlx::PgConnection;
use uuid::Uuid;

use super::Database;
use crate::error::Result;
use crate::models::*;

/// Active rules, in evaluation order
pub async fn load_active_rules(conn: &mut PgConnection) -> Result<Vec<DbPointRule>> {
    let rules = sqlx::query_as::<_, DbPointRule>(
        r#"
        SELECT id, name, description, conditions, reward_points, level, is_active,
               sort_order, created_at, updated_at
        FROM point_rules
        WHERE is_active
        ORDER BY sort_order, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rules)
}

/// Active achievements, in evaluation order
pub async fn load_active_achievements(conn: &mut PgConnection) -> Result<Vec<DbAchievement>> {
    let achievements = sqlx::query_as::<_, DbAchievement>(
        r#"
        SELECT id, name, description, category, conditions, reward_points, level,
               required_count, is_active, sort_order, created_at, updated_at
        FROM achievements
        WHERE is_active
        ORDER BY sort_order, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(achievements)
}

impl Database {
    // === Rule Repository ===

    pub async fn list_rules(&self) -> Result<Vec<DbPointRule>> {
        let rules = sqlx::query_as::<_, DbPointRule>(
            r#"
            SELECT id, name, description, conditions, reward_points, level, is_active,
                   sort_order, created_at, updated_at
            FROM point_rules
            ORDER BY sort_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    /// Insert a rule. Conditions must already be validated.
    pub async fn create_rule(&self, rule: &UpsertRuleRequest) -> Result<DbPointRule> {
        let rule = sqlx::query_as::<_, DbPointRule>(
            r#"
            INSERT INTO point_rules (id, name, description, conditions, reward_points, level,
                                     is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, conditions, reward_points, level, is_active,
                      sort_order, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.conditions)
        .bind(rule.reward_points)
        .bind(rule.level)
        .bind(rule.is_active)
        .bind(rule.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(rule)
    }

    /// Replace a rule's definition. `None` when the rule does not exist.
    pub async fn update_rule(
        &self,
        rule_id: Uuid,
        rule: &UpsertRuleRequest,
    ) -> Result<Option<DbPointRule>> {
        let rule = sqlx::query_as::<_, DbPointRule>(
            r#"
            UPDATE point_rules SET
                name = $2,
                description = $3,
                conditions = $4,
                reward_points = $5,
                level = $6,
                is_active = $7,
                sort_order = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, conditions, reward_points, level, is_active,
                      sort_order, created_at, updated_at
            "#,
        )
        .bind(rule_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.conditions)
        .bind(rule.reward_points)
        .bind(rule.level)
        .bind(rule.is_active)
        .bind(rule.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rule)
    }

    /// Deactivate a rule. Ledger entries keep referring to it.
    pub async fn deactivate_rule(&self, rule_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE point_rules SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(rule_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // === Achievement Repository ===

    pub async fn list_achievements(&self) -> Result<Vec<DbAchievement>> {
        let achievements = sqlx::query_as::<_, DbAchievement>(
            r#"
            SELECT id, name, description, category, conditions, reward_points, level,
                   required_count, is_active, sort_order, created_at, updated_at
            FROM achievements
            ORDER BY sort_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    pub async fn create_achievement(
        &self,
        achievement: &UpsertAchievementRequest,
    ) -> Result<DbAchievement> {
        let achievement = sqlx::query_as::<_, DbAchievement>(
            r#"
            INSERT INTO achievements (id, name, description, category, conditions, reward_points,
                                      level, required_count, is_active, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, description, category, conditions, reward_points, level,
                      required_count, is_active, sort_order, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&achievement.name)
        .bind(&achievement.description)
        .bind(&achievement.category)
        .bind(&achievement.conditions)
        .bind(achievement.reward_points)
        .bind(achievement.level)
        .bind(achievement.required_count)
        .bind(achievement.is_active)
        .bind(achievement.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(achievement)
    }

    pub async fn update_achievement(
        &self,
        achievement_id: Uuid,
        achievement: &UpsertAchievementRequest,
    ) -> Result<Option<DbAchievement>> {
        let achievement = sqlx::query_as::<_, DbAchievement>(
            r#"
            UPDATE achievements SET
                name = $2,
                description = $3,
                category = $4,
                conditions = $5,
                reward_points = $6,
                level = $7,
                required_count = $8,
                is_active = $9,
                sort_order = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, category, conditions, reward_points, level,
                      required_count, is_active, sort_order, created_at, updated_at
            "#,
        )
        .bind(achievement_id)
        .bind(&achievement.name)
        .bind(&achievement.description)
        .bind(&achievement.category)
        .bind(&achievement.conditions)
        .bind(achievement.reward_points)
        .bind(achievement.level)
        .bind(achievement.required_count)
        .bind(achievement.is_active)
        .bind(achievement.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    /// Deactivate an achievement. Users who completed it keep it.
    pub async fn deactivate_achievement(&self, achievement_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE achievements SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
