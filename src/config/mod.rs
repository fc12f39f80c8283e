/*!
Configuration of a compilation.

All options are held in a single [Config] passed to the
[Compiler](crate::context::Compiler); there is no global state.
Every option remembers where its value came from, so `.pragma` directives in
the source can apply last-writer-wins without ever overriding a value set on
the command line.
*/

mod pragma;
pub use pragma::apply_pragmas;

/// Where the current value of an option came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    Default,
    Pragma,
    CommandLine,
}

/// A single configuration option: a value and the source which set it.
#[derive(Clone, Debug)]
pub struct ConfigOption<T> {
    pub name: &'static str,
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigOption<T> {
    fn new(name: &'static str, value: T) -> Self {
        ConfigOption {
            name,
            value,
            source: ConfigSource::Default,
        }
    }

    /// Sets the value from the command line; pragmas will not override it.
    pub fn set_from_cli(&mut self, value: T) {
        self.value = value;
        self.source = ConfigSource::CommandLine;
    }

    /// Sets the value from a pragma, unless the command line already did.
    pub fn set_from_pragma(&mut self, value: T) {
        if self.source != ConfigSource::CommandLine {
            self.value = value;
            self.source = ConfigSource::Pragma;
        }
    }
}

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// Restrict computation to demanded tuples via the magic-set transform.
    pub magic_transform: ConfigOption<bool>,

    /// Emit a subproof subroutine per user clause.
    pub provenance: ConfigOption<bool>,

    /// Wrap rules and relations in log timers and size counters.
    pub profile: ConfigOption<bool>,

    /// The directory fact files are read from.
    pub fact_dir: ConfigOption<String>,

    /// The directory output files are written to; `-` sends output to stdout.
    pub output_dir: ConfigOption<String>,

    /// Worker count forwarded to the backend for parallel blocks.
    pub jobs: ConfigOption<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            magic_transform: ConfigOption::new("magic-transform", false),
            provenance: ConfigOption::new("provenance", false),
            profile: ConfigOption::new("profile", false),
            fact_dir: ConfigOption::new("fact-dir", ".".to_string()),
            output_dir: ConfigOption::new("output-dir", ".".to_string()),
            jobs: ConfigOption::new("jobs", 1),
        }
    }
}
