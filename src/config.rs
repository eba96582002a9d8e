/// Which flavour of the instruction set to emulate. Only the shifts
/// (8xy6, 8xyE) and the register range loads (Fx55, Fx65) differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Variant {
    /// COSMAC VIP behaviour: shifts read Vy, range loads move I
    #[default]
    Chip8,
    /// HP48 behaviour: shifts work on Vx in place, range loads leave I alone
    SuperChip8,
}

/// What DRW does with pixels that fall off the edge of the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    #[default]
    Clip,
    Wrap,
}

/// Phosphor persistence of pixels that have just been turned off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Fading {
    #[default]
    Off,
    /// an unset pixel takes this many presented frames to go fully dark
    On { frames: u32 },
}

impl Fading {
    pub const DEFAULT_FRAMES: u32 = 500;

    pub fn default_on() -> Self {
        Fading::On {
            frames: Self::DEFAULT_FRAMES,
        }
    }

    /// the fade level a pixel gets as it is unset
    pub fn max_level(self) -> u32 {
        match self {
            Fading::Off => 0,
            Fading::On { frames } => frames,
        }
    }
}

/// Interpreter configuration, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Config {
    pub variant: Variant,
    pub edge: EdgePolicy,
    pub fading: Fading,
}

impl Config {
    pub fn with_variant(self, variant: Variant) -> Self {
        Config { variant, ..self }
    }

    pub fn with_edge(self, edge: EdgePolicy) -> Self {
        Config { edge, ..self }
    }

    pub fn with_fading(self, fading: Fading) -> Self {
        Config { fading, ..self }
    }
}
