fn main() {
    #[cfg(feature = "sp1")]
    {
        sp1_build::build_program("../programs/transaction2");
        sp1_build::build_program("../programs/transaction16");
    }
}
