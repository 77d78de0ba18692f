mod sorting_network;

pub use sorting_network::SortingNetwork;
