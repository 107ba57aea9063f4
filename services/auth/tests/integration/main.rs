mod authcode_test;
mod helpers;
