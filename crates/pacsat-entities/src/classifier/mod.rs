pub mod classifier_bs;
