use crate::domain::card::Card;
use crate::error::Result;
use std::io::Write;

/// Writes final card states as CSV.
///
/// Numbers are rendered masked to their last four digits; the full plaintext
/// never reaches the output.
pub struct CardWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CardWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    pub fn write_cards(&mut self, cards: Vec<Card>) -> Result<()> {
        self.writer
            .write_record(["card", "owner", "number", "expires", "status", "balance"])?;
        for card in cards {
            let number = card.masked_number().unwrap_or_default();
            self.writer.write_record([
                card.id.to_string(),
                card.owner.to_string(),
                number,
                card.expires.to_string(),
                card.status.to_string(),
                card.balance.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
