use serde::Serialize;
use std::fmt::Write;

use crate::blockchain::Block;

#[derive(Serialize)]
pub struct ChainReport<'a> {
    pub length: usize,
    pub difficulty: u32,
    pub block_reward: u64,
    pub chain: &'a [Block],
}

/// Block-by-block text dump of the accepted chain.
pub fn render_text(chain: &[Block], block_reward: u64) -> String {
    let mut out = String::new();
    for block in chain {
        render_block(&mut out, block, block_reward);
        out.push('\n');
    }
    out
}

fn render_block(out: &mut String, b: &Block, block_reward: u64) {
    let data = if b.payload.is_empty() {
        "no transactions".to_string()
    } else {
        b.payload
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };
    write!(
        out,
        "Block:\n\
         Created by: {miner}\n\
         {miner} was awarded {block_reward} VC\n\
         Id: {id}\n\
         Timestamp: {ts}\n\
         Magic number: {nonce}\n\
         Hash of the previous block:\n{prev}\n\
         Hash of the block:\n{hash}\n\
         Block data:\n{data}\n\
         Block was generating for {secs} seconds\n\
         {change}\n",
        miner = b.miner,
        id = b.sequence_id,
        ts = b.timestamp,
        nonce = b.nonce,
        prev = b.previous_digest,
        hash = b.digest,
        secs = b.generation_secs,
        change = b.change_description(),
    )
    .expect("write block report");
}

/// JSON dump of the accepted chain.
pub fn render_json(chain: &[Block], difficulty: u32, block_reward: u64) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ChainReport {
        length: chain.len(),
        difficulty,
        block_reward,
        chain,
    })
}
