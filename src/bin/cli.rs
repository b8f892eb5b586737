use brindle::moves::magic::loader::try_load_magic_tables;

fn main() {
    brindle::logger::init_logging("logs/brindle.log", "info");

    // §6.4: a corrupt/failed magic-table build is the engine's one fatal
    // startup condition; fail loudly on stderr with a nonzero exit code
    // rather than letting a panic from deep inside `Engine::new` do it.
    if let Err(e) = try_load_magic_tables() {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }

    brindle::uci::run();
}
