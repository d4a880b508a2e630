mod aggregate_test;
