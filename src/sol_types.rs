use alloy::sol;

sol! {
    /// Surface of the on-chain proxy contract that this connector drives.
    #[derive(Debug, PartialEq, Eq)]
    interface WeCrossProxy {
        function constantCall(string name, bytes argsWithMethodId) external returns (bytes memory);

        function constantCall(
            string transactionID,
            string path,
            string realMethod,
            bytes args
        ) external returns (bytes memory);

        function sendTransaction(string uid, string name, bytes argsWithMethodId) external returns (bytes memory);

        function sendTransaction(
            string uid,
            string transactionID,
            uint256 seq,
            string path,
            string realMethod,
            bytes args
        ) external returns (bytes memory);

        function getPaths() external view returns (string[] memory);

        function registerCNS(string path, string addr) external;
    }
}
