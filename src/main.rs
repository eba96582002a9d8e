use std::error::Error;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, ValueEnum};
use env_logger::{Builder, Target};
use log::info;

use chip8vm::display::MonoTermDisplay;
use chip8vm::environment;
use chip8vm::input::StdinInput;
use chip8vm::sound::{Mute, SimpleBeep, Sound};
use chip8vm::{Chip8Interpreter, Config, EdgePolicy, Fading, Handle, Variant};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    Chip8,
    Schip8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EdgeArg {
    Clip,
    Wrap,
}

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 / SUPER-CHIP interpreter in the terminal", long_about = None)]
struct Args {
    /// program to load at 0x200
    rom: PathBuf,

    /// shift and load/store quirks
    #[arg(long, value_enum, default_value = "chip8")]
    variant: VariantArg,

    /// what sprites do at the screen edge
    #[arg(long, value_enum, default_value = "clip")]
    edge: EdgeArg,

    /// frames an unset pixel takes to fade; 0 disables
    #[arg(long, default_value_t = Fading::DEFAULT_FRAMES)]
    fade: u32,

    /// no beeping
    #[arg(short, long)]
    quiet: bool,

    /// write the log here instead of stderr, which the terminal display
    /// draws over
    #[arg(long)]
    log: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> Config {
        let variant = match self.variant {
            VariantArg::Chip8 => Variant::Chip8,
            VariantArg::Schip8 => Variant::SuperChip8,
        };
        let edge = match self.edge {
            EdgeArg::Clip => EdgePolicy::Clip,
            EdgeArg::Wrap => EdgePolicy::Wrap,
        };
        let fading = match self.fade {
            0 => Fading::Off,
            frames => Fading::On { frames },
        };
        Config::default()
            .with_variant(variant)
            .with_edge(edge)
            .with_fading(fading)
    }
}

/// log to `path` if given; either way RUST_LOG picks the level
fn init_logging(path: Option<&Path>) -> Result<(), io::Error> {
    let mut builder = Builder::from_default_env();
    if let Some(path) = path {
        builder.target(Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

/// the terminal side of a run, on the main thread
fn present_in_terminal(handle: &Handle) -> chip8vm::Result<()> {
    let mut display = MonoTermDisplay::new()?;
    let mut input = StdinInput::new()?;
    environment::present(handle, &mut display, &mut input)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log.as_deref())?;

    // initialise
    let sound: Box<dyn Sound> = if args.quiet {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };
    let mut interpreter = Chip8Interpreter::new(args.config(), sound)?;

    // load a program; nothing starts if this fails
    let mut f = File::open(&args.rom)?;
    interpreter.load_program(&mut f)?;
    info!("running {}", args.rom.display());

    let handle = interpreter.handle();
    let cpu = thread::Builder::new()
        .name("cpu".into())
        .spawn(move || interpreter.run())?;

    let result = present_in_terminal(&handle);

    // whatever happened, make sure the cpu thread comes home
    handle.stop();
    if cpu.join().is_err() {
        return Err("cpu thread panicked".into());
    }

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    result?;
    Ok(())
}
