extern crate log;
extern crate simplelog;

use std::fs;
use std::time::Instant;

use log::info;

use mat_lang::diagnostics::ErrorHandler;
use mat_lang::*;

fn main() -> Result<(), i32> {
    let config = configure_cli().get_matches();

    if let Some(level) = get_log_level(&config) {
        configure_logging(level).expect("Failed to configure logger.")
    }

    let (options, format) = match get_options(&config).and_then(|o| get_format(&config).map(|f| (o, f))) {
        Ok(settings) => settings,
        Err(msg) => {
            eprintln!("{}", msg);
            return Err(ERR_INPUT);
        }
    };

    let input = config
        .value_of("input")
        .expect("Expected an input program unit to compile");
    let unit = match fs::read_to_string(input)
        .map_err(|e| format!("Could not read {}: {}", input, e))
        .and_then(|text| parse_unit(&text, format))
    {
        Ok(unit) => unit,
        Err(msg) => {
            eprintln!("{}", msg);
            return Err(ERR_INPUT);
        }
    };

    let start = Instant::now();
    let mut handler = ErrorHandler::new();
    let result = compile(unit, &options, &mut handler);
    print_diagnostics(&handler);
    let output = match result {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{}", err);
            return Err(match err {
                PipelineError::TypeCheck(_) => ERR_TYPE_CHECK,
                PipelineError::Semantic(_) => ERR_SEMANTIC,
                PipelineError::UnsupportedProfile(_) => ERR_INPUT,
            });
        }
    };
    info!("Compiled {} in {:.3}s", input, start.elapsed().as_secs_f32());

    let text = match output.render(format) {
        Ok(text) => text,
        Err(msg) => {
            eprintln!("{}", msg);
            return Err(ERR_OUTPUT);
        }
    };
    match config.value_of("output") {
        Some(path) => fs::write(path, text).map_err(|e| {
            eprintln!("Could not write {}: {}", path, e);
            ERR_OUTPUT
        }),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
