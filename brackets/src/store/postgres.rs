//! PostgreSQL repository.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    errors::{StoreError, StoreResult},
    repository::{BracketRepository, MatchFilter},
};
use crate::bracket::{
    Bracket, ForwardTarget, Group, GroupKind, Match, MatchStatus, Participant, Round, Slot,
    SlotIndex, Stage, StageFormat, StageId, StageStatus,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

const MATCH_COLUMNS: &str = "id, stage_id, group_id, round_id, position, \
     slot1_type, slot1_ref, slot2_type, slot2_ref, score1, score2, status, winner_slot, \
     forward_winner_match, forward_winner_slot, forward_loser_match, forward_loser_slot";

fn corrupt(what: impl Into<String>) -> StoreError {
    StoreError::Corrupt(what.into())
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(format!("{column} is negative: {value}")))
}

fn to_i32<T>(value: T, column: &str) -> StoreResult<i32>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| StoreError::OutOfRange(format!("{column} = {value}")))
}

fn conflict_or_database(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::Database(err),
    }
}

fn slot_columns(slot: Slot) -> (&'static str, Option<i64>) {
    match slot {
        Slot::Participant(id) => ("participant", Some(id)),
        Slot::WinnerOf(id) => ("winner_of", Some(id)),
        Slot::LoserOf(id) => ("loser_of", Some(id)),
        Slot::Empty => ("empty", None),
    }
}

fn decode_slot(kind: &str, reference: Option<i64>) -> StoreResult<Slot> {
    match (kind, reference) {
        ("participant", Some(id)) => Ok(Slot::Participant(id)),
        ("winner_of", Some(id)) => Ok(Slot::WinnerOf(id)),
        ("loser_of", Some(id)) => Ok(Slot::LoserOf(id)),
        ("empty", None) => Ok(Slot::Empty),
        _ => Err(corrupt(format!("slot {kind:?} with reference {reference:?}"))),
    }
}

fn slot_index_column(index: SlotIndex) -> i16 {
    i16::from(index.number())
}

fn decode_slot_index(value: i16) -> StoreResult<SlotIndex> {
    match value {
        1 => Ok(SlotIndex::One),
        2 => Ok(SlotIndex::Two),
        other => Err(corrupt(format!("slot index {other}"))),
    }
}

fn decode_target(match_id: Option<i64>, slot: Option<i16>) -> StoreResult<Option<ForwardTarget>> {
    match (match_id, slot) {
        (Some(match_id), Some(slot)) => Ok(Some(ForwardTarget {
            match_id,
            slot: decode_slot_index(slot)?,
        })),
        (None, None) => Ok(None),
        _ => Err(corrupt("forward target with half its columns set")),
    }
}

fn target_columns(target: Option<ForwardTarget>) -> (Option<i64>, Option<i16>) {
    (
        target.map(|t| t.match_id),
        target.map(|t| slot_index_column(t.slot)),
    )
}

fn decode_group_kind(kind: &str) -> StoreResult<GroupKind> {
    [
        GroupKind::WinnersBracket,
        GroupKind::LosersBracket,
        GroupKind::GrandFinal,
        GroupKind::Pool,
    ]
    .into_iter()
    .find(|k| k.to_string() == kind)
    .ok_or_else(|| corrupt(format!("group kind {kind:?}")))
}

fn decode_stage(row: &PgRow) -> StoreResult<Stage> {
    let format: String = row.try_get("format")?;
    let status: String = row.try_get("status")?;
    let settings: String = row.try_get("settings")?;
    let participant_count: i32 = row.try_get("participant_count")?;

    Ok(Stage {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        format: format
            .parse::<StageFormat>()
            .map_err(|e| corrupt(e.to_string()))?,
        participant_count: to_u32(participant_count, "participant_count")? as usize,
        settings: serde_json::from_str(&settings)?,
        status: status.parse::<StageStatus>().map_err(corrupt)?,
        winner: row.try_get("winner")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn decode_match(row: &PgRow) -> StoreResult<Match> {
    let slot1_type: String = row.try_get("slot1_type")?;
    let slot2_type: String = row.try_get("slot2_type")?;
    let status: String = row.try_get("status")?;
    let position: i32 = row.try_get("position")?;
    let score1: Option<i32> = row.try_get("score1")?;
    let score2: Option<i32> = row.try_get("score2")?;
    let winner_slot: Option<i16> = row.try_get("winner_slot")?;

    Ok(Match {
        id: row.try_get("id")?,
        stage_id: row.try_get("stage_id")?,
        group_id: row.try_get("group_id")?,
        round_id: row.try_get("round_id")?,
        position: to_u32(position, "position")?,
        slot1: decode_slot(&slot1_type, row.try_get("slot1_ref")?)?,
        slot2: decode_slot(&slot2_type, row.try_get("slot2_ref")?)?,
        score1: score1.map(|s| to_u32(s, "score1")).transpose()?,
        score2: score2.map(|s| to_u32(s, "score2")).transpose()?,
        status: status.parse::<MatchStatus>().map_err(corrupt)?,
        winner_slot: winner_slot.map(decode_slot_index).transpose()?,
        forward_winner_to: decode_target(
            row.try_get("forward_winner_match")?,
            row.try_get("forward_winner_slot")?,
        )?,
        forward_loser_to: decode_target(
            row.try_get("forward_loser_match")?,
            row.try_get("forward_loser_slot")?,
        )?,
    })
}

/// PostgreSQL implementation of `BracketRepository`
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_match(tx: &mut Transaction<'_, Postgres>, m: &Match) -> StoreResult<()> {
        let (slot1_type, slot1_ref) = slot_columns(m.slot1);
        let (slot2_type, slot2_ref) = slot_columns(m.slot2);
        let (winner_match, winner_slot) = target_columns(m.forward_winner_to);
        let (loser_match, loser_slot) = target_columns(m.forward_loser_to);

        sqlx::query(
            r#"
            INSERT INTO matches (
                stage_id, id, group_id, round_id, position,
                slot1_type, slot1_ref, slot2_type, slot2_ref, score1, score2, status, winner_slot,
                forward_winner_match, forward_winner_slot, forward_loser_match, forward_loser_slot
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(m.stage_id)
        .bind(m.id)
        .bind(m.group_id)
        .bind(m.round_id)
        .bind(to_i32(m.position, "position")?)
        .bind(slot1_type)
        .bind(slot1_ref)
        .bind(slot2_type)
        .bind(slot2_ref)
        .bind(m.score1.map(|s| to_i32(s, "score1")).transpose()?)
        .bind(m.score2.map(|s| to_i32(s, "score2")).transpose()?)
        .bind(m.status.to_string())
        .bind(m.winner_slot.map(slot_index_column))
        .bind(winner_match)
        .bind(winner_slot)
        .bind(loser_match)
        .bind(loser_slot)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn allocate_stage_id(&self) -> StoreResult<StageId> {
        let row = sqlx::query("SELECT nextval(pg_get_serial_sequence('stages', 'id')) AS id")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("id")?)
    }

    async fn insert_bracket(
        &self,
        bracket: &Bracket,
        external_id: Option<&str>,
    ) -> StoreResult<()> {
        let stage = &bracket.stage;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stages (id, name, format, participant_count, settings, status, winner, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(stage.id)
        .bind(&stage.name)
        .bind(stage.format.to_string())
        .bind(to_i32(stage.participant_count, "participant_count")?)
        .bind(serde_json::to_string(&stage.settings)?)
        .bind(stage.status.to_string())
        .bind(stage.winner)
        .bind(stage.created_at)
        .bind(stage.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, || format!("stage {} already exists", stage.id)))?;

        for p in &bracket.participants {
            sqlx::query("INSERT INTO participants (stage_id, id, name, seed) VALUES ($1, $2, $3, $4)")
                .bind(stage.id)
                .bind(p.id)
                .bind(&p.name)
                .bind(to_i32(p.seed, "seed")?)
                .execute(&mut *tx)
                .await?;
        }

        for g in &bracket.groups {
            sqlx::query("INSERT INTO stage_groups (stage_id, id, number, kind) VALUES ($1, $2, $3, $4)")
                .bind(stage.id)
                .bind(g.id)
                .bind(to_i32(g.number, "number")?)
                .bind(g.kind.to_string())
                .execute(&mut *tx)
                .await?;
        }

        for r in &bracket.rounds {
            sqlx::query("INSERT INTO rounds (stage_id, id, group_id, number) VALUES ($1, $2, $3, $4)")
                .bind(stage.id)
                .bind(r.id)
                .bind(r.group_id)
                .bind(to_i32(r.number, "number")?)
                .execute(&mut *tx)
                .await?;
        }

        for m in &bracket.matches {
            Self::insert_match(&mut tx, m).await?;
        }

        if let Some(external_id) = external_id {
            sqlx::query("INSERT INTO stage_identities (external_id, stage_id) VALUES ($1, $2)")
                .bind(external_id)
                .bind(stage.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    conflict_or_database(e, || format!("identity {external_id:?} -> {}", stage.id))
                })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn select_bracket(&self, stage_id: StageId) -> StoreResult<Option<Bracket>> {
        let Some(stage_row) = sqlx::query(
            "SELECT id, name, format, participant_count, settings, status, winner, created_at, updated_at
             FROM stages WHERE id = $1",
        )
        .bind(stage_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let stage = decode_stage(&stage_row)?;

        let participants = sqlx::query(
            "SELECT id, stage_id, name, seed FROM participants WHERE stage_id = $1 ORDER BY seed",
        )
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> StoreResult<Participant> {
            Ok(Participant {
                id: r.try_get("id")?,
                stage_id: r.try_get("stage_id")?,
                name: r.try_get("name")?,
                seed: to_u32(r.try_get("seed")?, "seed")?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

        let groups = sqlx::query(
            "SELECT id, stage_id, number, kind FROM stage_groups WHERE stage_id = $1 ORDER BY id",
        )
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> StoreResult<Group> {
            let kind: String = r.try_get("kind")?;
            Ok(Group {
                id: r.try_get("id")?,
                stage_id: r.try_get("stage_id")?,
                number: to_u32(r.try_get("number")?, "number")?,
                kind: decode_group_kind(&kind)?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

        let rounds = sqlx::query(
            "SELECT id, stage_id, group_id, number FROM rounds WHERE stage_id = $1 ORDER BY id",
        )
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> StoreResult<Round> {
            Ok(Round {
                id: r.try_get("id")?,
                stage_id: r.try_get("stage_id")?,
                group_id: r.try_get("group_id")?,
                number: to_u32(r.try_get("number")?, "number")?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

        let matches = self.select_matches(stage_id, &MatchFilter::default()).await?;

        Ok(Some(Bracket {
            stage,
            participants,
            groups,
            rounds,
            matches,
        }))
    }

    async fn select_stage_ids(&self) -> StoreResult<Vec<StageId>> {
        let rows = sqlx::query("SELECT id FROM stages ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| r.try_get::<StageId, _>("id").map_err(StoreError::from))
            .collect()
    }

    async fn select_matches(
        &self,
        stage_id: StageId,
        filter: &MatchFilter,
    ) -> StoreResult<Vec<Match>> {
        let sql = format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE stage_id = $1
              AND ($2::BIGINT IS NULL OR group_id = $2)
              AND ($3::BIGINT IS NULL OR round_id = $3)
              AND ($4::TEXT IS NULL OR status = $4)
              AND ($5::BIGINT IS NULL
                   OR (slot1_type = 'participant' AND slot1_ref = $5)
                   OR (slot2_type = 'participant' AND slot2_ref = $5))
            ORDER BY id
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(stage_id)
            .bind(filter.group_id)
            .bind(filter.round_id)
            .bind(filter.status.map(|s| s.to_string()))
            .bind(filter.participant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_match).collect()
    }

    async fn update_matches(&self, stage: &Stage, matches: &[Match]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE stages SET status = $1, winner = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(stage.status.to_string())
        .bind(stage.winner)
        .bind(stage.updated_at)
        .bind(stage.id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            return Err(StoreError::Missing(format!("stage {}", stage.id)));
        }

        for m in matches {
            let (slot1_type, slot1_ref) = slot_columns(m.slot1);
            let (slot2_type, slot2_ref) = slot_columns(m.slot2);
            let updated = sqlx::query(
                r#"
                UPDATE matches
                SET slot1_type = $1, slot1_ref = $2, slot2_type = $3, slot2_ref = $4,
                    score1 = $5, score2 = $6, status = $7, winner_slot = $8
                WHERE stage_id = $9 AND id = $10
                "#,
            )
            .bind(slot1_type)
            .bind(slot1_ref)
            .bind(slot2_type)
            .bind(slot2_ref)
            .bind(m.score1.map(|s| to_i32(s, "score1")).transpose()?)
            .bind(m.score2.map(|s| to_i32(s, "score2")).transpose()?)
            .bind(m.status.to_string())
            .bind(m.winner_slot.map(slot_index_column))
            .bind(stage.id)
            .bind(m.id)
            .execute(&mut *tx)
            .await?;

            // dropping the transaction rolls back the rows written so far
            if updated.rows_affected() != 1 {
                return Err(StoreError::Missing(format!(
                    "match {} in stage {}",
                    m.id, stage.id
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn select_identities(&self) -> StoreResult<Vec<(String, StageId)>> {
        let rows = sqlx::query("SELECT external_id, stage_id FROM stage_identities")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| -> StoreResult<(String, StageId)> {
                Ok((r.try_get("external_id")?, r.try_get("stage_id")?))
            })
            .collect()
    }
}
