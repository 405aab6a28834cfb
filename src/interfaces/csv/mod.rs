pub mod card_writer;
pub mod op_reader;
