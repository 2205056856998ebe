pub mod aspectsort_core;
