pub mod drawing_annotator;
