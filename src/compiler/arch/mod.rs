/**
 * Arch contains abstractions for general architectural concepts such as
 * the width of a machine value.  This is part of the architecture
 * independent inteface between the MIR and the actual generation of
 * assembly code.
 */
pub mod registers;
