//! `ct comment`: append a comment to a task's discussion.

use crate::cmd::parse_id;
use crate::output::{OutputMode, pretty_kv, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::{SystemClock, micros_to_rfc3339};
use caretaker_core::lifecycle::Lifecycle;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,

    /// Comment body.
    pub body: String,
}

pub fn run_comment(
    args: &CommentArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let comment = Lifecycle::new(&mut conn, &clock)
        .add_comment(&session, id, &args.body)
        .map_err(|err| reject(output, &err))?;

    render_mode(
        output,
        &comment,
        |c, w| writeln!(w, "{}  {}  {}", c.comment_id, c.author_id, c.body),
        |c, w| {
            writeln!(w, "✓ Comment added")?;
            pretty_kv(w, "Author", format!("{} ({})", c.author_id, c.author_type))?;
            pretty_kv(w, "At", micros_to_rfc3339(c.created_at_us))?;
            writeln!(w)?;
            writeln!(w, "{}", c.body)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CommentArgs,
    }

    #[test]
    fn comment_args_parse() {
        let w = Wrapper::parse_from(["test", "TSK-00002", "On site tomorrow"]);
        assert_eq!(w.args.id, "TSK-00002");
        assert_eq!(w.args.body, "On site tomorrow");
    }
}
