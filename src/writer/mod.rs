pub mod index_writer;
