//! Splits a requested question count into fixed-size blocks and, for mixed
//! runs, plans a per-question difficulty distribution. Deterministic and
//! pure.

use crate::models::domain::question::Difficulty;

/// Questions are generated and validated in chunks of at most this size.
pub const BLOCK_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

/// A planned chunk of work. Sizes partition the requested count exactly.
#[derive(Debug, Clone)]
pub struct Block {
    pub index: usize,
    pub size: usize,
    pub status: BlockStatus,
}

/// Plans blocks covering `question_count` with no remainder dropped,
/// e.g. 12 becomes sizes [5, 5, 2].
pub fn plan_blocks(question_count: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut remaining = question_count;
    let mut index = 0;

    while remaining > 0 {
        let size = remaining.min(BLOCK_SIZE);
        blocks.push(Block {
            index,
            size,
            status: BlockStatus::Pending,
        });
        remaining -= size;
        index += 1;
    }

    blocks
}

/// Difficulty plan for a mixed-difficulty run, targeting roughly
/// 30% easy / 40% medium / 30% hard, interleaved so each block sees a
/// spread rather than a sorted run.
pub fn mixed_difficulty_plan(question_count: usize) -> Vec<Difficulty> {
    let easy = (question_count * 3).div_ceil(10);
    let hard = (question_count * 3) / 10;
    let medium = question_count - easy - hard;

    let mut pools = [
        (Difficulty::Easy, easy),
        (Difficulty::Medium, medium),
        (Difficulty::Hard, hard),
    ];

    let mut plan = Vec::with_capacity(question_count);
    while plan.len() < question_count {
        for (difficulty, remaining) in pools.iter_mut() {
            if *remaining > 0 {
                plan.push(*difficulty);
                *remaining -= 1;
            }
        }
    }

    plan
}
