use clap::{App, Arg, ArgMatches};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::{
    compiler::{
        compiler::{Emit, Format, Options},
        types::WidthProfile,
    },
    diagnostics::ErrorHandler,
    result::Result,
};

// Exit Codes for different types of errors
pub const ERR_INPUT: i32 = 1;
pub const ERR_TYPE_CHECK: i32 = 2;
pub const ERR_SEMANTIC: i32 = 3;
pub const ERR_OUTPUT: i32 = 4;

pub fn print_diagnostics(handler: &ErrorHandler) {
    for d in handler.diagnostics() {
        eprintln!("{}", d);
    }
}

pub fn configure_cli() -> clap::App<'static, 'static> {
    App::new("mat compiler")
        .version("0.1.0")
        .about("Compiles a resolved mat program unit into i386 assembly for the GNU assembler")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true)
                .help("The resolved program unit to compile"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("Name the output file that the assembly will be written to.  Without it the output goes to stdout"),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .possible_values(&["json", "yaml"])
                .default_value("json")
                .takes_value(true)
                .help("The format of the program unit and of the --emit mir|types dumps"),
        )
        .arg(
            Arg::with_name("emit")
                .long("emit")
                .possible_values(&["asm", "mir", "types"])
                .default_value("asm")
                .takes_value(true)
                .help("The stage whose output is written: assembly, a MIR dump or a type table dump"),
        )
        .arg(
            Arg::with_name("profile")
                .short("p")
                .long("profile")
                .possible_values(&["ilp32", "lp64", "ilp64", "llp64"])
                .default_value("ilp32")
                .takes_value(true)
                .help("The integer and pointer widths.  Assembly can only be generated for ilp32"),
        )
        .arg(
            Arg::with_name("verbose-asm")
                .long("verbose-asm")
                .help("Comment the assembly with the source location of every statement"),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .takes_value(true)
                .help("Writes the compiler's log to the terminal at the given level"),
        )
}

pub fn get_log_level(args: &ArgMatches) -> Option<LevelFilter> {
    match args.value_of("log-level")? {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub fn configure_logging(level: LevelFilter) -> Result<()> {
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .map_err(|e| e.to_string())
}

pub fn get_format(args: &ArgMatches) -> Result<Format> {
    args.value_of("format").unwrap_or("json").parse()
}

/// Gathers the pipeline settings from the command line.
pub fn get_options(args: &ArgMatches) -> Result<Options> {
    let emit: Emit = args.value_of("emit").unwrap_or("asm").parse()?;
    let profile_name = args.value_of("profile").unwrap_or("ilp32");
    let profile = WidthProfile::by_name(profile_name)
        .ok_or_else(|| format!("Unknown profile: {}", profile_name))?;
    Ok(Options {
        emit,
        profile,
        verbose_asm: args.is_present("verbose-asm"),
        file_name: args.value_of("input").map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = configure_cli().get_matches_from(vec!["matc", "-i", "unit.json"]);
        let options = get_options(&args).unwrap();
        assert_eq!(options.emit, Emit::Asm);
        assert_eq!(options.profile, WidthProfile::ILP32);
        assert!(!options.verbose_asm);
        assert_eq!(options.file_name.as_deref(), Some("unit.json"));
        assert_eq!(get_format(&args).unwrap(), Format::Json);
        assert_eq!(get_log_level(&args), None);
    }

    #[test]
    fn dump_options() {
        let args = configure_cli().get_matches_from(vec![
            "matc",
            "-i",
            "unit.yaml",
            "--format",
            "yaml",
            "--emit",
            "types",
            "--profile",
            "lp64",
            "--log-level",
            "debug",
        ]);
        let options = get_options(&args).unwrap();
        assert_eq!(options.emit, Emit::Types);
        assert_eq!(options.profile, WidthProfile::LP64);
        assert_eq!(get_format(&args).unwrap(), Format::Yaml);
        assert_eq!(get_log_level(&args), Some(LevelFilter::Debug));
    }
}
