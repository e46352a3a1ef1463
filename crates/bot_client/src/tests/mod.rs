mod loopback_tests;
