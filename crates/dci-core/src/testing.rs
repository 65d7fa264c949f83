//! Scripted [`CommandRunner`] for unit tests.

use crate::error::CiError;
use crate::exec::{CommandRunner, Completed, Invocation};

type Matcher = Box<dyn Fn(&Invocation) -> bool>;

/// Records every invocation and answers with the first matching scripted result.
/// Unmatched invocations succeed with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    pub calls: Vec<Invocation>,
    rules: Vec<(Matcher, Completed)>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        mut self,
        matcher: impl Fn(&Invocation) -> bool + 'static,
        result: Completed,
    ) -> Self {
        self.rules.push((Box::new(matcher), result));
        self
    }

    /// Answers invocations whose args contain `arg` with exit `code` and `stdout`.
    pub fn on_arg(self, arg: &'static str, code: i32, stdout: &str) -> Self {
        self.on(
            move |inv| inv.args.iter().any(|a| a == arg),
            Completed {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Simulates Ctrl+C while an invocation whose args contain `arg` runs; the
    /// child then exits the way cargo does on SIGINT.
    pub fn interrupt_on(self, arg: &'static str) -> Self {
        self.on(
            move |inv| {
                let hit = inv.args.iter().any(|a| a == arg);
                if hit {
                    crate::interrupt::trigger_for_test();
                }
                hit
            },
            Completed {
                code: 130,
                ..Completed::default()
            },
        )
    }

    /// Command lines seen so far, without the program name.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.iter().map(|inv| inv.args.join(" ")).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Completed, CiError> {
        self.calls.push(invocation.clone());
        Ok(self
            .rules
            .iter()
            .find(|(matcher, _)| matcher(invocation))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}
