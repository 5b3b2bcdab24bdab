use notebook_translator::{handle_translation, make_app};
use std::process;

fn main() {
    let matches = make_app().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = handle_translation(&matches) {
        eprintln!("{e:?}");
        process::exit(1);
    }
}
