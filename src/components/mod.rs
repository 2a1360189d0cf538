pub mod heritage_graph;
