//! Frequency naming command.

use clap::Args;
use melody_core::tuning;

#[derive(Args)]
pub struct NameArgs {
    /// Frequencies in Hz
    #[arg(
        value_name = "HZ",
        allow_negative_numbers = true,
        required_unless_present = "notes"
    )]
    frequencies: Vec<f32>,

    /// Pitch names to look up in the reference octave (C, Db, ... B, C2)
    #[arg(long = "note", value_name = "NAME")]
    notes: Vec<String>,
}

pub fn run(args: NameArgs) -> anyhow::Result<()> {
    for freq in args.frequencies {
        println!("{}", describe(freq));
    }
    for note in &args.notes {
        println!("{}", lookup(note)?);
    }
    Ok(())
}

/// One output line: the frequency, its pitch name and the offset in cents.
fn describe(freq: f32) -> String {
    let folded = tuning::fold_into_reference_octave(freq);
    match (folded, tuning::find_nearest_pitch_class(freq)) {
        (Some(folded), Some(class)) => format!(
            "{freq:>10.2} Hz  {:<3} {:+6.1} cents",
            class.name,
            tuning::cents_deviation(folded, class.frequency)
        ),
        _ => format!("{freq:>10.2} Hz  -"),
    }
}

/// Reference frequency of a pitch name.
fn lookup(note: &str) -> anyhow::Result<String> {
    let Some(freq) = tuning::reference_frequency(note) else {
        let known: Vec<_> = tuning::REFERENCE_OCTAVE.iter().map(|p| p.name).collect();
        anyhow::bail!("unknown pitch '{note}' (known: {})", known.join(", "));
    };
    Ok(format!("{note:<3} {freq:>10.2} Hz"))
}
