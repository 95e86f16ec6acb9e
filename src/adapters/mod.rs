pub mod command_annotator;
