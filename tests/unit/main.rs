//! Unit test modules.

mod aggregator_test;
mod classifier_test;
mod frame_decoder_test;
