pub mod fasta;
pub mod vcf;
