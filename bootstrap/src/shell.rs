//! Minimal POSIX shell statement builder.
//!
//! Scripts are assembled from discrete [`Statement`]s rather than format strings so
//! each branch of the bootstrap logic can be inspected on its own. Rendering rules:
//!
//! - top-level statements are chained with ` &&` (one per line), so the first failing
//!   step aborts the container;
//! - statements inside an `if` block are newline-separated and indented one tab;
//! - wrapped command arguments go on their own ` \`-continued line, one tab deeper.

use std::fmt;

/// Interpreter the orchestrator launches the script with.
pub const SHELL: &str = "bash";

/// Test guarding an `if` block. The block runs when the test holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// `[ ! -e path ]`
    Missing(String),
    /// `[ ! -s path ]`, true for absent or zero-length files.
    Empty(String),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "[ ! -e {path} ]"),
            Self::Empty(path) => write!(f, "[ ! -s {path} ]"),
        }
    }
}

/// A program invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    wrapped: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            wrapped: Vec::new(),
        }
    }

    /// Append an argument on the program's own line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an argument (or flag and value) on a continuation line.
    pub fn line(mut self, fragment: impl Into<String>) -> Self {
        self.wrapped.push(fragment.into());
        self
    }

    /// Append several continuation lines.
    pub fn lines<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wrapped.extend(fragments.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments on the program's own line.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Continuation-line arguments, in order.
    pub fn wrapped(&self) -> &[String] {
        &self.wrapped
    }

    fn render(&self, depth: usize, out: &mut String) {
        out.push_str(&indent(depth));
        out.push_str(&self.program);
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        for fragment in &self.wrapped {
            out.push_str(" \\\n");
            out.push_str(&indent(depth + 1));
            out.push_str(fragment);
        }
    }
}

/// One step of a bootstrap script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `echo "message"`
    Announce(String),
    /// `echo text`, with `text` left to shell expansion.
    Echo(String),
    /// `echo $var > path`
    WriteVar { var: String, path: String },
    /// `sleep secs`
    Sleep(u64),
    /// Run a command.
    Run(Command),
    /// `if <condition>; then ... [else ...] fi`
    Guard {
        condition: Condition,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    },
}

impl Statement {
    /// Run `then` only when `path` does not exist.
    pub fn unless_exists(path: impl Into<String>, then: Vec<Statement>) -> Self {
        Self::Guard {
            condition: Condition::Missing(path.into()),
            then,
            otherwise: Vec::new(),
        }
    }

    /// Run `then` when `path` is absent or empty, `otherwise` when it has content.
    pub fn if_empty_else(
        path: impl Into<String>,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    ) -> Self {
        Self::Guard {
            condition: Condition::Empty(path.into()),
            then,
            otherwise,
        }
    }

    fn render(&self, depth: usize, out: &mut String) {
        let pad = indent(depth);
        match self {
            Self::Announce(message) => {
                out.push_str(&format!("{pad}echo \"{message}\""));
            }
            Self::Echo(text) => out.push_str(&format!("{pad}echo {text}")),
            Self::WriteVar { var, path } => out.push_str(&format!("{pad}echo ${var} > {path}")),
            Self::Sleep(secs) => out.push_str(&format!("{pad}sleep {secs}")),
            Self::Run(command) => command.render(depth, out),
            Self::Guard {
                condition,
                then,
                otherwise,
            } => {
                out.push_str(&format!("{pad}if {condition}; then\n"));
                render_block(then, depth + 1, out);
                if !otherwise.is_empty() {
                    out.push_str(&format!("{pad}else\n"));
                    render_block(otherwise, depth + 1, out);
                }
                out.push_str(&format!("{pad}fi"));
            }
        }
    }
}

fn render_block(statements: &[Statement], depth: usize, out: &mut String) {
    for statement in statements {
        statement.render(depth, out);
        out.push('\n');
    }
}

fn indent(depth: usize) -> String {
    "\t".repeat(depth)
}

/// The ordered statements a node runs at container start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapScript {
    statements: Vec<Statement>,
}

impl BootstrapScript {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Every top-level command and every command nested in a guard, in order.
    pub fn commands(&self) -> Vec<&Command> {
        fn collect<'a>(statements: &'a [Statement], out: &mut Vec<&'a Command>) {
            for statement in statements {
                match statement {
                    Statement::Run(command) => out.push(command),
                    Statement::Guard {
                        then, otherwise, ..
                    } => {
                        collect(then, out);
                        collect(otherwise, out);
                    }
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.statements, &mut out);
        out
    }

    /// First command running `program`.
    pub fn find_command(&self, program: &str) -> Option<&Command> {
        self.commands().into_iter().find(|c| c.program() == program)
    }

    /// Render to the text handed to the shell.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                out.push_str(" &&\n");
            }
            statement.render(0, &mut out);
        }
        out
    }

    /// Container entrypoint: `bash -c <script>`.
    pub fn container_command(&self) -> Vec<String> {
        vec![SHELL.to_string(), "-c".to_string(), self.render()]
    }
}

impl fmt::Display for BootstrapScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
