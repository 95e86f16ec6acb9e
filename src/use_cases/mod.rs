pub mod process_drawing;
