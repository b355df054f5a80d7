//! Anonymous-node tagging

use super::{PostprocessContext, Postprocessor};
use crate::graph::GraphResult;
use tracing::info;

/// Prefix marking a blank-node-derived external key
pub const BLANK_PREFIX: &str = "_:";

/// Labels every blank-node-keyed node `anonymous`
pub struct AnonymousNodeTagger;

impl Postprocessor for AnonymousNodeTagger {
    fn name(&self) -> &'static str {
        "anonymous-node-tagging"
    }

    fn run(&self, ctx: &PostprocessContext<'_>) -> GraphResult<()> {
        let mut tagged = 0u64;
        for id in ctx.store().node_ids() {
            let is_blank = ctx
                .store()
                .with_node(id, |node| node.key.starts_with(BLANK_PREFIX))
                .unwrap_or(false);
            if is_blank {
                ctx.writer.add_label(id, "anonymous")?;
                tagged += 1;
            }
        }
        info!(tagged, "tagged anonymous nodes");
        Ok(())
    }
}
