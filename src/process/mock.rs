use super::{CommandSpec, ProcessOutput, ProcessRunner};
use crate::error::ProcessError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// Canned behavior for a matching command
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Exit immediately with this output
    Output(ProcessOutput),
    /// Exit with this output after a delay; delays past the deadline time out
    Delayed(Duration, ProcessOutput),
    /// Never produce anything; the deadline always expires
    Hang,
    /// The executable does not exist
    NotFound,
}

impl MockResponse {
    /// Clean exit with the given stdout
    pub fn stdout<B: Into<Vec<u8>>>(stdout: B) -> Self {
        MockResponse::Output(ProcessOutput {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: Vec::new(),
        })
    }

    /// Exit with the given status and stderr
    pub fn exit<B: Into<Vec<u8>>>(code: i32, stderr: B) -> Self {
        MockResponse::Output(ProcessOutput {
            code: Some(code),
            success: code == 0,
            stdout: Vec::new(),
            stderr: stderr.into(),
        })
    }
}

struct Rule {
    program: String,
    arg_fragment: Option<String>,
    response: MockResponse,
}

impl Rule {
    fn matches(&self, command: &CommandSpec) -> bool {
        command.program == self.program
            && self
                .arg_fragment
                .as_ref()
                .map_or(true, |fragment| command.args.iter().any(|a| a.contains(fragment)))
    }
}

/// Process runner for tests: answers from a rule table instead of spawning
pub struct MockProcessRunner {
    rules: Mutex<Vec<Rule>>,
    fallback: MockResponse,
    invocations: Mutex<Vec<CommandSpec>>,
}

impl MockProcessRunner {
    /// Unmatched commands behave as if the executable were missing
    pub fn new() -> Self {
        Self::with_fallback(MockResponse::NotFound)
    }

    pub fn with_fallback(fallback: MockResponse) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Answer every invocation of `program` with `response`
    pub fn on(self, program: &str, response: MockResponse) -> Self {
        self.push_rule(program, None, response);
        self
    }

    /// Answer invocations of `program` having an argument containing `fragment`
    pub fn on_arg(self, program: &str, fragment: &str, response: MockResponse) -> Self {
        self.push_rule(program, Some(fragment.to_string()), response);
        self
    }

    /// Replace or add a rule after construction; earlier rules win, so new rules go first
    pub fn set_arg_response(&self, program: &str, fragment: &str, response: MockResponse) {
        let mut rules = self.rules.lock();
        rules.retain(|r| !(r.program == program && r.arg_fragment.as_deref() == Some(fragment)));
        rules.insert(
            0,
            Rule {
                program: program.to_string(),
                arg_fragment: Some(fragment.to_string()),
                response,
            },
        );
    }

    fn push_rule(&self, program: &str, arg_fragment: Option<String>, response: MockResponse) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            arg_fragment,
            response,
        });
    }

    /// Every command run so far, in order
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().clone()
    }

    fn response_for(&self, command: &CommandSpec) -> MockResponse {
        self.rules
            .lock()
            .iter()
            .find(|rule| rule.matches(command))
            .map(|rule| rule.response.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        self.invocations.lock().push(command.clone());
        let response = self.response_for(command);
        debug!("Mock process {} -> {:?}", command.display(), response);

        let timed_out = || ProcessError::Timeout {
            program: command.program.clone(),
            after: command.timeout,
        };

        match response {
            MockResponse::Output(output) => Ok(output),
            MockResponse::Delayed(delay, output) => {
                if delay >= command.timeout {
                    tokio::time::sleep(command.timeout).await;
                    Err(timed_out())
                } else {
                    tokio::time::sleep(delay).await;
                    Ok(output)
                }
            }
            MockResponse::Hang => {
                tokio::time::sleep(command.timeout).await;
                Err(timed_out())
            }
            MockResponse::NotFound => Err(ProcessError::NotFound {
                program: command.program.clone(),
            }),
        }
    }
}
